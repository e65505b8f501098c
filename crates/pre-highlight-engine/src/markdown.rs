//! Markdown to HTML with fenced code blocks routed through a [`FenceRenderer`].

use crate::fence::{FenceInfo, FenceRenderer, RenderEnv};
use crate::provider::HighlightProvider;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

struct OpenFence {
    info: FenceInfo,
    content: String,
}

/// Render `source` to HTML.
///
/// Fenced code blocks are replaced by the fence renderer's output and their
/// payloads land in `env` (or inline, per the renderer's transport). Every
/// other event, indented code blocks included, goes to the stock writer.
pub fn render_markdown(
    source: &str,
    renderer: &FenceRenderer,
    provider: &dyn HighlightProvider,
    env: &mut RenderEnv,
) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut events = Vec::new();
    let mut open: Option<OpenFence> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                open = Some(OpenFence {
                    info: FenceInfo::parse(&info),
                    content: String::new(),
                });
            }
            Event::Text(text) if open.is_some() => {
                if let Some(fence) = open.as_mut() {
                    fence.content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) if open.is_some() => {
                if let Some(fence) = open.take() {
                    let out = renderer.render(&fence.info, &fence.content, provider, env);
                    events.push(Event::Html(CowStr::from(out.html)));
                }
            }
            other => events.push(other),
        }
    }

    let mut html_out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut html_out, events.into_iter());
    html_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::RangeTuple;
    use crate::provider::{
        CustomRange, CustomRanges, ProviderError, ProviderOutput, ProviderRequest, ScopeRef,
    };
    use pretty_assertions::assert_eq;

    struct FirstWordProvider;

    impl HighlightProvider for FirstWordProvider {
        fn engine(&self) -> &str {
            "custom"
        }

        fn highlight(
            &self,
            code: &str,
            _request: &ProviderRequest<'_>,
        ) -> Result<ProviderOutput, ProviderError> {
            let end = code.find(' ').unwrap_or(code.len()) as i64;
            Ok(ProviderOutput::Ranges(CustomRanges::from(vec![
                CustomRange::Plain(ScopeRef::Name("keyword".into()), 0, end),
            ])))
        }
    }

    #[test]
    fn fenced_blocks_become_bound_pre_elements() {
        let source = "# Title\n\n```js\nconst x = 1\n```\n\nafter\n";
        let mut env = RenderEnv::new();
        let html = render_markdown(source, &FenceRenderer::default(), &FirstWordProvider, &mut env);
        assert_eq!(
            html,
            "<h1>Title</h1>\n<pre data-pre-highlight=\"hl-1\"><code class=\"language-js\">const x = 1\n</code></pre>\n<p>after</p>\n"
        );
        let payload = &env.payloads["hl-1"];
        assert_eq!(payload.text_length, 12);
        assert_eq!(payload.ranges, vec![RangeTuple(0, 0, 5)]);
    }

    #[test]
    fn info_attributes_reach_the_payload() {
        let source = "```py {emphasize-lines=\"2\"}\na = 1\nb = 2\n```\n";
        let mut env = RenderEnv::new();
        render_markdown(source, &FenceRenderer::default(), &FirstWordProvider, &mut env);
        assert_eq!(
            env.payloads["hl-1"].scopes,
            vec!["hl-keyword", "hl-pre-lines-emphasis"]
        );
    }

    #[test]
    fn indented_code_is_left_alone() {
        let mut env = RenderEnv::new();
        let html = render_markdown(
            "    plain <code>\n",
            &FenceRenderer::default(),
            &FirstWordProvider,
            &mut env,
        );
        assert_eq!(html, "<pre><code>plain &lt;code&gt;\n</code></pre>\n");
        assert!(env.is_empty());
    }
}
