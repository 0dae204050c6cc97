//! Reply obfuscation tags
//!
//! Batch replies carry near-identical text, which the provider rejects as
//! duplicate content. Each reply gets a fresh random prefix.

use rand::Rng;

pub const TAG_LEN: usize = 8;

/// Eight random lowercase letters followed by one space
pub fn tag() -> String {
    tag_with(&mut rand::thread_rng())
}

fn tag_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut tag: String = (0..TAG_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();
    tag.push(' ');
    tag
}

/// Prepend a fresh tag to `text`
pub fn obfuscate(text: &str) -> String {
    format!("{}{}", tag(), text)
}
