mod provider;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pre_highlight_config::HighlightConfig;
use pre_highlight_engine::classify::{ScopeClassifier, ScopeMode, ScopeQuery};
use pre_highlight_engine::fence::{
    DATA_SCRIPT_ID, SCOPE_STYLE_TAG_ID, Transport, render_payload_script, render_scope_style_tag,
};
use pre_highlight_engine::payload::parse_emphasis;
use pre_highlight_engine::{
    FenceInfo, FenceRenderer, HighlightPayload, ProviderOutput, RenderEnv, render_markdown,
};
use pre_highlight_runtime::{
    ApplyOptions, ApplyOutcome, ColorScheme, Diagnostic, HighlightRuntime, MemoryDocument,
    PayloadMap,
};
use provider::{CommandProvider, DumpProvider};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Parser)]
#[command(name = "pre-highlight", version, about = "Range-based highlighting for fenced code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render Markdown to HTML with bound code blocks and payloads
    Render {
        markdown: PathBuf,
        /// Highlighter command; overrides `provider` from the config file
        #[arg(long)]
        provider_cmd: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build one payload from a saved provider output
    Payload {
        #[arg(long)]
        text: PathBuf,
        #[arg(long)]
        tokens: PathBuf,
        #[arg(long, default_value = "")]
        lang: String,
        #[arg(long, default_value = "custom")]
        engine: String,
        /// Emphasized lines, e.g. `2-3,5`
        #[arg(long)]
        emphasize: Option<String>,
        #[arg(long)]
        comment_mark: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the scope name and bucket for one token
    Classify {
        #[arg(long, default_value = "")]
        lang: String,
        /// Scope names, innermost first
        #[arg(long = "scope")]
        scopes: Vec<String>,
        #[arg(long, default_value = "keyword")]
        mode: String,
        token: String,
    },
    /// Apply a payload to an in-memory block and report what happened
    Verify {
        #[arg(long)]
        text: PathBuf,
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, default_value = "auto")]
        color_scheme: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            markdown,
            provider_cmd,
            config,
            output,
        } => {
            let html = render(&markdown, provider_cmd.as_deref(), config.as_deref())?;
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{html}"),
            }
        }
        Commands::Payload {
            text,
            tokens,
            lang,
            engine,
            emphasize,
            comment_mark,
            config,
        } => {
            let fence = FenceInfo {
                lang,
                emphasize: emphasize.as_deref().map(parse_emphasis).unwrap_or_default(),
                comment_mark,
            };
            let payload = payload(&text, &tokens, &fence, &engine, config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Classify {
            lang,
            scopes,
            mode,
            token,
        } => {
            let mode: ScopeMode = mode.parse().map_err(anyhow::Error::msg)?;
            let (label, bucket) = classify(&lang, &scopes, mode, &token);
            println!("scope: {label}");
            println!("bucket: {bucket}");
        }
        Commands::Verify {
            text,
            payload,
            color_scheme,
        } => {
            let (outcome, diagnostics) =
                verify(&text, &payload, ColorScheme::parse_lenient(&color_scheme))?;
            println!("{}", serde_json::to_string(&outcome)?);
            for diagnostic in diagnostics {
                println!("{}", serde_json::to_string(&diagnostic)?);
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<HighlightConfig> {
    let config = match path {
        Some(path) => {
            let path = HighlightConfig::expand_path(path).unwrap_or_else(|| path.to_path_buf());
            HighlightConfig::load_from_path(&path)?
                .with_context(|| format!("Config file not found: {}", path.display()))?
        }
        None => HighlightConfig::load()?.unwrap_or_default(),
    };
    Ok(config)
}

fn render(markdown: &Path, provider_cmd: Option<&str>, config: Option<&Path>) -> Result<String> {
    let source = read(markdown)?;
    let config = load_config(config)?;
    let command = provider_cmd
        .map(str::to_string)
        .or_else(|| config.provider.clone());
    let Some(provider) = command.as_deref().and_then(CommandProvider::parse) else {
        bail!("No highlighter command: pass --provider-cmd or set `provider` in the config file");
    };

    let options = config.into_options();
    let transport = options.transport;
    let renderer = FenceRenderer::for_provider(options, &provider);
    let mut env = RenderEnv::new();
    let mut html = render_markdown(&source, &renderer, &provider, &mut env);
    if transport == Transport::Env {
        html.push_str(&render_payload_script(&env, DATA_SCRIPT_ID)?);
    }
    html.push_str(&render_scope_style_tag(&env, SCOPE_STYLE_TAG_ID));
    log::info!("rendered {} highlighted blocks", env.payloads.len());
    Ok(html)
}

fn payload(
    text: &Path,
    tokens: &Path,
    fence: &FenceInfo,
    engine: &str,
    config: Option<&Path>,
) -> Result<HighlightPayload> {
    let text = read(text)?;
    let output: ProviderOutput = serde_json::from_str(&read(tokens)?)
        .with_context(|| format!("{} is not provider output JSON", tokens.display()))?;
    let provider = DumpProvider::new(output, engine);
    let renderer = FenceRenderer::for_provider(load_config(config)?.into_options(), &provider);
    Ok(renderer.build_payload(fence, &text, &provider)?)
}

fn classify(lang: &str, scopes: &[String], mode: ScopeMode, token: &str) -> (String, String) {
    let classifier = ScopeClassifier::default();
    let query = ScopeQuery::new(scopes, token);
    let label = classifier.classify(&query, lang, mode, None);
    let bucket = classifier.bucket(&query, lang, None);
    (label, bucket.as_str().to_string())
}

fn verify(
    text: &Path,
    payload: &Path,
    color_scheme: ColorScheme,
) -> Result<(ApplyOutcome, Vec<Diagnostic>)> {
    let text = read(text)?;
    let payload: Value = serde_json::from_str(&read(payload)?)
        .with_context(|| format!("{} is not JSON", payload.display()))?;

    let mut doc = MemoryDocument::new();
    let root = doc.root();
    let body = doc.body();
    doc.append_code_block(body, Some("hl-1"), &[text.as_str()]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut map = PayloadMap::new();
    map.insert("hl-1".to_string(), Arc::new(payload));
    let options = ApplyOptions {
        color_scheme,
        payload_map: Some(map),
        on_diagnostic: Some(Arc::new(move |diagnostic: &Diagnostic| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(diagnostic.clone());
            }
        })),
        ..Default::default()
    };

    let outcome = HighlightRuntime::new().apply(&mut doc, root, &options);
    let diagnostics = seen.lock().map(|seen| seen.clone()).unwrap_or_default();
    Ok((outcome, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn payload_is_built_from_a_dump() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "code.js", "let a\nlet b\n");
        let tokens = write(
            &dir,
            "tokens.json",
            r#"{"kind": "ranges", "ranges": [["keyword", 0, 3], ["keyword", 6, 9]]}"#,
        );
        let config = write(&dir, "config.toml", "");
        let fence = FenceInfo {
            lang: "js".to_string(),
            emphasize: parse_emphasis("2"),
            comment_mark: None,
        };

        let payload = payload(&text, &tokens, &fence, "custom", Some(&config)).unwrap();
        assert_eq!(payload.text_length, 12);
        assert_eq!(payload.scopes, vec!["hl-keyword", "hl-pre-lines-emphasis"]);
        assert_eq!(payload.ranges.len(), 3);
    }

    #[test]
    fn verify_reports_skipped_ranges() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "code.txt", "abc");
        let payload = write(
            &dir,
            "payload.json",
            r#"{"v": 1, "textLength": 3, "scopes": ["a"], "ranges": [[0, 0, 2], [0, 2, 9]]}"#,
        );

        let (outcome, diagnostics) = verify(&text, &payload, ColorScheme::Light).unwrap();
        assert_eq!(outcome.applied_ranges, 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].reason.as_str(), "range-out-of-bounds");
    }

    #[test]
    fn classify_prints_bucket() {
        let scopes = vec!["keyword.control.js".to_string()];
        let (label, bucket) = classify("js", &scopes, ScopeMode::Semantic, "if");
        assert_eq!(label, "keyword.control.js");
        assert_eq!(bucket, "keyword");
    }

    #[test]
    fn render_needs_a_provider() {
        let dir = TempDir::new().unwrap();
        let markdown = write(&dir, "doc.md", "```js\nx\n```\n");
        let config = write(&dir, "config.toml", "");
        let err = render(&markdown, None, Some(&config)).unwrap_err();
        assert!(err.to_string().contains("No highlighter command"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
