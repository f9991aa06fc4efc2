use pretty_assertions::assert_eq;

use xdom::XDom;
use xdom::block::path::Placement;
use xdom::parser::Parser;
use xdom::syntax::Syntax;

fn parse(source: &str) -> XDom {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

#[test]
fn inline_macro_inside_paragraph() {
    let dom = parse("Hello {{bold text=\"x\"/}} world\n");
    assert_eq!(
        dom.to_events_string(),
        "beginParagraph\n\
         onWord: [Hello]\n\
         onSpace\n\
         onMacro: [bold] [text=x] [null]\n\
         onSpace\n\
         onWord: [world]\n\
         endParagraph\n"
    );

    let invocations = dom.invocations();
    assert_eq!(invocations.len(), 1);
    let (_, invocation, placement) = &invocations[0];
    assert_eq!(*placement, Placement::Inline);
    assert_eq!(invocation.span, Some(6..24));
}

#[test]
fn standalone_macros_between_paragraphs() {
    let dom = parse("{{toc/}}\n\nIntro text.\n\n{{code lang=\"rust\"}}\nfn main() {}\n{{/code}}\n");
    assert_eq!(
        dom.to_events_string(),
        "onMacro: [toc] [] [null]\n\
         beginParagraph\n\
         onWord: [Intro]\n\
         onSpace\n\
         onWord: [text]\n\
         onSpecialSymbol: [.]\n\
         endParagraph\n\
         onMacro: [code] [lang=rust] [fn main() {}]\n"
    );
    assert!(
        dom.invocations()
            .iter()
            .all(|(_, _, placement)| *placement == Placement::Block)
    );
}

#[test]
fn headings_lists_and_formatting() {
    let dom = parse("# Title\n\n- *a*\n- b\n");
    assert_eq!(
        dom.to_events_string(),
        "beginHeader: [1]\n\
         onWord: [Title]\n\
         endHeader: [1]\n\
         beginList: [BULLETED]\n\
         beginListItem\n\
         beginFormat: [ITALIC]\n\
         onWord: [a]\n\
         endFormat: [ITALIC]\n\
         endListItem\n\
         beginListItem\n\
         onWord: [b]\n\
         endListItem\n\
         endList: [BULLETED]\n"
    );
}

#[test]
fn fenced_code_is_not_scanned_for_macros() {
    let dom = parse("```\n{{toc/}}\n```\n");
    assert!(dom.invocations().is_empty());
    assert_eq!(dom.to_events_string(), "onVerbatimStandalone: [{{toc/}}]\n");
}

#[test]
fn invocations_record_the_parser_syntax() {
    let syntax = Syntax::new("markdown", "1.0");
    let dom = Parser::new("{{toc/}}\n".to_string(), 3)
        .with_syntax(syntax.clone())
        .parse()
        .expect("parse failed");
    assert_eq!(dom.source_id, 3);
    let (_, invocation, _) = &dom.invocations()[0];
    assert_eq!(invocation.syntax, syntax);
}

#[test]
fn unclosed_standalone_macro_is_an_error() {
    let errors = Parser::new("{{box}}never closed\n".to_string(), 0)
        .parse()
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("never closed"));
    assert_eq!(errors[0].span.start, 0);
    assert!(!errors[0].notes.is_empty());
}

#[test]
fn inline_error_span_is_absolute() {
    let errors = Parser::new("text {{box a}} more\n".to_string(), 0)
        .parse()
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("expected '='"));
    assert_eq!(errors[0].span, 11..12);
}

#[test]
fn literal_braces_stay_text() {
    let dom = parse("a {{ b\n");
    assert!(dom.invocations().is_empty());
    assert_eq!(dom.to_string(), "a {{ b\n");
}

#[test]
fn inline_macro_content_keeps_its_markup() {
    let dom = parse("Say {{code}}**x**{{/code}} now\n");
    assert_eq!(
        dom.to_events_string(),
        "beginParagraph\n\
         onWord: [Say]\n\
         onSpace\n\
         onMacro: [code] [] [**x**]\n\
         onSpace\n\
         onWord: [now]\n\
         endParagraph\n"
    );
}

#[test]
fn inline_macro_content_may_span_paragraphs() {
    let dom = parse("Say {{box}}a\n\nb{{/box}}\n");
    assert_eq!(dom.blocks.len(), 1);
    let invocations = dom.invocations();
    assert_eq!(invocations.len(), 1);
    let (_, invocation, placement) = &invocations[0];
    assert_eq!(*placement, Placement::Inline);
    assert_eq!(invocation.call.raw_content.as_deref(), Some("a\n\nb"));
    assert_eq!(invocation.span, Some(4..23));
}

#[test]
fn inline_spans_are_source_offsets() {
    let dom = parse("a &amp; {{nope/}}\n");
    let (_, invocation, _) = &dom.invocations()[0];
    assert_eq!(invocation.span, Some(8..17));
}

#[test]
fn code_spans_are_not_scanned_for_macros() {
    let dom = parse("Use `{{toc/}}` here\n");
    assert!(dom.invocations().is_empty());
    assert_eq!(
        dom.to_events_string(),
        "beginParagraph\n\
         onWord: [Use]\n\
         onSpace\n\
         onVerbatimInline: [{{toc/}}]\n\
         onSpace\n\
         onWord: [here]\n\
         endParagraph\n"
    );
}

#[test]
fn macros_inside_emphasis_stay_inside_it() {
    let dom = parse("**{{toc/}} bold**\n");
    assert_eq!(
        dom.to_events_string(),
        "beginParagraph\n\
         beginFormat: [BOLD]\n\
         onMacro: [toc] [] [null]\n\
         onSpace\n\
         onWord: [bold]\n\
         endFormat: [BOLD]\n\
         endParagraph\n"
    );
}
