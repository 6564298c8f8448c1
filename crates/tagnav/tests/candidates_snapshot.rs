use std::path::PathBuf;

use insta::assert_snapshot;
use tagnav::app::navigation::{Candidate, NavigationController};

#[test]
fn candidates_render_for_disambiguation() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let records = NavigationController::new().lookup(
        "parse",
        Some(&root.join("nested/widget.rs")),
        Some(&root),
    );

    let rendered = records
        .iter()
        .map(Candidate::from)
        .enumerate()
        .map(|(idx, candidate)| format!("{}. {candidate}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n");

    assert_snapshot!(rendered, @r"
    1. parse  widget.rs  fn parse(raw: &str) -> Widget {  [impl:Widget]
    2. parse  parser.rs  pub fn parse(input: &str) -> Ast {
    3. parse_expr  parser.rs  fn parse_expr(tokens: &mut Tokens) -> Ast {
    ");
}
