use pre_highlight_engine::{HighlightProvider, ProviderError, ProviderOutput, ProviderRequest};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs an external highlighter per block: code on stdin, `--theme <name>`
/// when a theme is requested, language as the last argument, provider output
/// JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    engine: String,
}

impl CommandProvider {
    /// Split a command line with shell quoting rules. The engine name is the
    /// program's file stem. `None` for a blank line or an unclosed quote.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = split_command_line(command)?.into_iter();
        let program = parts.next()?;
        let engine = Path::new(&program)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());
        Some(Self {
            program,
            args: parts.collect(),
            engine,
        })
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }
}

impl HighlightProvider for CommandProvider {
    fn engine(&self) -> &str {
        &self.engine
    }

    fn highlight(&self, code: &str, request: &ProviderRequest<'_>) -> Result<ProviderOutput, ProviderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(request.theme.into_iter().flat_map(|theme| ["--theme", theme]))
            .arg(request.lang)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(code.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            // A highlighter may exit without reading all of its input.
            match writer.join().unwrap_or(Ok(())) {
                Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => Err(err),
                _ => output,
            }
        })?;

        if !output.status.success() {
            return Err(ProviderError::Failed {
                lang: request.lang.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        log::debug!(
            "{} produced {} bytes for '{}'",
            self.program,
            output.stdout.len(),
            request.lang
        );
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Words of a command line: whitespace separated, with `'single'` quotes
/// taken literally, `"double"` quotes honouring `\"` and `\\`, and a bare
/// backslash escaping the next character.
fn split_command_line(line: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => words.extend(word.take()),
            '\'' => {
                let word = word.get_or_insert_with(String::new);
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                let word = word.get_or_insert_with(String::new);
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\' | '$' | '`') => word.push(c),
                            c => {
                                word.push('\\');
                                word.push(c);
                            }
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => {
                let escaped = chars.next()?;
                word.get_or_insert_with(String::new).push(escaped);
            }
            c => word.get_or_insert_with(String::new).push(c),
        }
    }
    words.extend(word);
    Some(words)
}

/// Replays one saved provider output for every request.
#[derive(Debug, Clone)]
pub struct DumpProvider {
    output: ProviderOutput,
    engine: String,
}

impl DumpProvider {
    pub fn new(output: ProviderOutput, engine: impl Into<String>) -> Self {
        Self {
            output,
            engine: engine.into(),
        }
    }
}

impl HighlightProvider for DumpProvider {
    fn engine(&self) -> &str {
        &self.engine
    }

    fn highlight(&self, _code: &str, _request: &ProviderRequest<'_>) -> Result<ProviderOutput, ProviderError> {
        Ok(self.output.clone())
    }
}
