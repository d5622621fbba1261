//! HTML serialization handed to the persistence listener.
//!
//! One `<section>` per block carrying its id and kind, so the output can be
//! mapped back onto blocks.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::editing::{BlockKind, Document, Mark, NodeGroup, RenderBlock, RenderNode, Run, TextKind};

pub fn to_html(doc: &Document) -> String {
    let snapshot = doc.snapshot();
    let mut out = String::new();
    for block in &snapshot.blocks {
        render_block(&mut out, block);
    }
    out
}

fn render_block(out: &mut String, block: &RenderBlock) {
    let kind = match block.kind {
        BlockKind::Title => "title",
        BlockKind::Content => "content",
    };
    out.push_str(&format!(
        "<section data-block-id=\"{}\" data-kind=\"{kind}\">\n",
        block.id
    ));
    for group in block.groups() {
        match group {
            NodeGroup::Single(node) => render_node(out, node),
            NodeGroup::List { ordered, items } => {
                let tag = if ordered { "ol" } else { "ul" };
                out.push_str(&format!("<{tag}>\n"));
                for item in items {
                    render_node(out, item);
                }
                out.push_str(&format!("</{tag}>\n"));
            }
        }
    }
    out.push_str("</section>\n");
}

fn render_node(out: &mut String, node: &RenderNode) {
    match node {
        RenderNode::Text { kind, runs, .. } => {
            let (open, close) = match kind {
                TextKind::Paragraph => ("<p>".to_string(), "</p>".to_string()),
                TextKind::Heading { level } => (format!("<h{level}>"), format!("</h{level}>")),
                TextKind::ListItem { .. } => ("<li>".to_string(), "</li>".to_string()),
                TextKind::Quote => ("<blockquote>".to_string(), "</blockquote>".to_string()),
                TextKind::Code => ("<pre><code>".to_string(), "</code></pre>".to_string()),
            };
            out.push_str(&open);
            if *kind == TextKind::Code {
                let text: String = runs.iter().map(|run| run.text.as_str()).collect();
                out.push_str(&encode_text(&text));
            } else {
                for run in runs {
                    render_run(out, run);
                }
            }
            out.push_str(&close);
            out.push('\n');
        }
        RenderNode::Image { src, alt } => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">\n",
                encode_double_quoted_attribute(src),
                encode_double_quoted_attribute(alt)
            ));
        }
        RenderNode::Divider => out.push_str("<hr>\n"),
    }
}

fn mark_tag(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
        Mark::Strike => "s",
        Mark::Code => "code",
        Mark::Highlight => "mark",
    }
}

fn render_run(out: &mut String, run: &Run) {
    for mark in &run.marks {
        out.push_str(&format!("<{}>", mark_tag(*mark)));
    }
    let escaped = encode_text(&run.text);
    out.push_str(&escaped.replace('\n', "<br>"));
    for mark in run.marks.iter().rev() {
        out.push_str(&format!("</{}>", mark_tag(*mark)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Block, Node, TextBlock};
    use regex::Regex;

    /// Block ids are random; replace them so snapshots are stable
    fn redact(html: &str) -> String {
        let ids = Regex::new(r#"data-block-id="[0-9a-f-]+""#).unwrap();
        ids.replace_all(html, r#"data-block-id="[id]""#).into_owned()
    }

    fn doc(blocks: Vec<Block>) -> Document {
        Document::from_blocks(blocks).unwrap()
    }

    #[test]
    fn test_empty_document() {
        insta::assert_snapshot!(redact(&to_html(&Document::new())), @r#"
        <section data-block-id="[id]" data-kind="content">
        <p></p>
        </section>
        "#);
    }

    #[test]
    fn test_marks_and_escaping() {
        let text = TextBlock::paragraph("Fish & <chips>")
            .with_mark(Mark::Bold, 0..4)
            .with_mark(Mark::Italic, 2..6);
        let html = to_html(&doc(vec![Block::with_content(
            BlockKind::Title,
            "",
            vec![Node::heading(1, "Lunch"), Node::Text(text)],
        )]));
        insta::assert_snapshot!(redact(&html), @r#"
        <section data-block-id="[id]" data-kind="title">
        <h1>Lunch</h1>
        <p><strong>Fi</strong><strong><em>sh</em></strong><em> &amp;</em> &lt;chips&gt;</p>
        </section>
        "#);
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = to_html(&doc(vec![Block::with_content(
            BlockKind::Content,
            "",
            vec![
                Node::list_item(false, "a"),
                Node::list_item(false, "b"),
                Node::list_item(true, "first"),
                Node::Divider,
                Node::Image {
                    src: "https://cdn.example/a.png?x=1&y=\"2\"".to_string(),
                    alt: "chart".to_string(),
                },
            ],
        )]));
        insta::assert_snapshot!(redact(&html), @r#"
        <section data-block-id="[id]" data-kind="content">
        <ul>
        <li>a</li>
        <li>b</li>
        </ul>
        <ol>
        <li>first</li>
        </ol>
        <hr>
        <img src="https://cdn.example/a.png?x=1&amp;y=&quot;2&quot;" alt="chart">
        </section>
        "#);
    }

    #[test]
    fn test_code_and_line_breaks() {
        let html = to_html(&doc(vec![Block::with_content(
            BlockKind::Content,
            "",
            vec![
                Node::Text(TextBlock::with_text(TextKind::Code, "a < b")),
                Node::paragraph("one\ntwo"),
            ],
        )]));
        insta::assert_snapshot!(redact(&html), @r#"
        <section data-block-id="[id]" data-kind="content">
        <pre><code>a &lt; b</code></pre>
        <p>one<br>two</p>
        </section>
        "#);
    }
}
