//! End-to-end checks through the public `parse`/`lex` entry points,
//! covering the concrete scenarios and universal properties that drove
//! the lexer/parser/diagnostic design.

use protocore::ast::DeclAny;
use protocore::diagnostic::{Report, ReportOptions};
use protocore::lexer::lex;
use protocore::parser::parse;
use protocore::source::File;
use protocore::token::{Kind, Token};

fn lex_str(text: &str) -> (protocore::token::TokenStream, Report) {
    let file = File::new("t.proto", text);
    let mut report = Report::new(ReportOptions::default());
    let stream = lex(&file, &mut report);
    (stream, report)
}

#[test]
fn tokens_partition_the_source_exactly() {
    let (stream, _) = lex_str("message M {\n  int32 x = 1; // trailing\n}\n");
    let reconstructed: String = stream.all_ids().map(|id| stream.text(id)).collect();
    assert_eq!(reconstructed, "message M {\n  int32 x = 1; // trailing\n}\n");
}

#[test]
fn scenario_empty_declaration_file() {
    let file = File::new("t.proto", ";;;\n");
    let mut report = Report::new(ReportOptions::default());
    let ctx = parse(&file, &mut report);
    assert!(report.is_empty(), "{:#?}", report.diagnostics());
    assert_eq!(ctx.root().len(), 3);
    assert!(ctx.root().iter().all(|d| matches!(d, DeclAny::Empty(_))));
}

#[test]
fn scenario_unterminated_block_comment() {
    let (stream, report) = lex_str("/* hi\n");
    let ids: Vec<_> = stream.all_ids().collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(stream.kind(ids[0]), Kind::Comment);
    assert_eq!(stream.text(ids[0]), "/* hi\n");

    let diags = report.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].tag(), Some("unterminated"));
    let primary = diags[0].primary_snippet().expect("primary snippet");
    assert_eq!(primary.span.text(), "/*");
}

#[test]
fn scenario_bracket_mismatch_reports_both_spans() {
    let (_, report) = lex_str("message M { oneof x ) }");
    let diags = report.diagnostics();
    assert!(!diags.is_empty());
    let d = diags.iter().find(|d| d.tag() == Some("unterminated")).expect("mismatch diagnostic");
    let primary = d.primary_snippet().expect("primary snippet");
    assert_eq!(primary.span.text(), "{");
}

#[test]
fn scenario_implicit_string_concat_with_comments() {
    let (stream, report) = lex_str("x = \"a\" /* c */ \"b\";");
    assert!(report.is_empty(), "{:#?}", report.diagnostics());

    let string_ids: Vec<_> = stream.ids().filter(|id| stream.kind(*id) == Kind::String).collect();
    assert_eq!(string_ids.len(), 1, "the two string literals fuse into one");
    let fused = string_ids[0];
    let token = Token { stream: &stream, id: fused };
    assert_eq!(token.as_string(), "ab");

    let comment = stream.all_ids().find(|id| stream.kind(*id) == Kind::Comment).expect("comment token survives");
    assert!(stream.start(fused) <= stream.start(comment) && stream.end(comment) <= stream.end(fused));
}

#[test]
fn scenario_integer_overflow_hex_reports_once_no_panic() {
    let (stream, report) = lex_str("x = 0xFFFFFFFFFFFFFFFFFF;");
    let number = stream.ids().find(|id| stream.kind(*id) == Kind::Number).expect("number token");
    assert_eq!(stream.kind(number), Kind::Number);

    let overflows: Vec<_> = report.diagnostics().iter().filter(|d| d.tag() == Some("integer-overflow")).collect();
    assert_eq!(overflows.len(), 1);
}

#[test]
fn scenario_duplicate_diagnostics_with_cooperating_tag_keep_the_later_one() {
    use protocore::diagnostic::Message;
    use protocore::source::Span;

    let mut report = Report::new(ReportOptions::default());
    report.error(Message::new("my-tag", "first").at(Span::zero(), "here"));
    report.error(Message::new("my-tag", "second").at(Span::zero(), "here"));
    report.canonicalize();

    let diags = report.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message(), Some("second"));
}

#[test]
fn canonicalize_is_idempotent() {
    use protocore::diagnostic::Message;
    use protocore::source::Span;

    let mut report = Report::new(ReportOptions::default());
    report.error(Message::new("a", "one").at(Span::zero(), "here"));
    report.warn(Message::new("b", "two").at(Span::zero(), "here"));
    report.canonicalize();
    let once: Vec<_> = report.diagnostics().iter().map(|d| (d.tag().map(str::to_owned), d.message().map(str::to_owned))).collect();
    report.canonicalize();
    let twice: Vec<_> = report.diagnostics().iter().map(|d| (d.tag().map(str::to_owned), d.message().map(str::to_owned))).collect();
    assert_eq!(once, twice);
}

#[test]
fn serialization_round_trips_through_the_portable_form() {
    use protocore::diagnostic::Message;
    use protocore::source::Span;

    let mut report = Report::new(ReportOptions::default());
    report.error(Message::new("demo", "something went wrong").at(Span::zero(), "here"));
    let proto = report.to_proto();
    let restored = Report::from_proto(proto).expect("round trip decodes");
    assert_eq!(restored.diagnostics().len(), report.diagnostics().len());
    assert_eq!(restored.diagnostics()[0].message(), report.diagnostics()[0].message());
}

#[test]
fn full_proto_file_parses_with_defs_bodies_and_options() {
    let text = r#"
        syntax = "proto3";
        package acme.widgets;
        import public "google/protobuf/timestamp.proto";

        option java_package = "com.acme.widgets";

        message Widget {
            string name = 1;
            repeated string tags = 2 [deprecated = true];
            map<string, int32> ratings = 3;

            enum Kind {
                UNKNOWN = 0;
                GADGET = 1;
            }
            Kind kind = 4;

            reserved 5, 10 to 12;
            extensions 1000 to max;
        }

        service Widgets {
            rpc List(Widget) returns (stream Widget);
        }
    "#;
    let file = File::new("widgets.proto", text);
    let mut report = Report::new(ReportOptions::default());
    let ctx = parse(&file, &mut report);
    assert!(report.is_empty(), "{:#?}", report.diagnostics());
    assert_eq!(ctx.root().len(), 6);
}

#[test]
fn malformed_file_recovers_and_never_panics() {
    let samples = [
        "message M { !!! int32 x = 1; } message N { bool ok = 1; }",
        "syntax = ;",
        "service S { rpc",
        "enum E { A = }",
        "/* unterminated",
        "\"unterminated string",
    ];
    for text in samples {
        let file = File::new("bad.proto", text);
        let mut report = Report::new(ReportOptions::default());
        let _ctx = parse(&file, &mut report);
    }
}
