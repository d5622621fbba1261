// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_lesson_markdown(sections: usize) -> String {
    let section = "## Section\n\nParagraph with **some** content and a `code` span.\n\n- Bullet point\n- Another item\n\n> A quote worth keeping.\n\n---\n\n";
    format!("# Lesson\n\n---\n\n{}", section.repeat(sections))
}
