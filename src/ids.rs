/// Source of ids for headings the reader rendered without one.
pub trait HeadingIdGenerator {
    /// Returns a 32-character lowercase hex token, unique within one book.
    fn generate(&mut self) -> String;
}

/// Random v4 UUIDs in their simple (hyphen-less) form.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHeadingIds;

impl HeadingIdGenerator for RandomHeadingIds {
    fn generate(&mut self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic ids: `000…001`, `000…002`, …
#[derive(Debug, Clone, Default)]
pub struct SequentialHeadingIds {
    issued: u128,
}

impl HeadingIdGenerator for SequentialHeadingIds {
    fn generate(&mut self) -> String {
        self.issued += 1;
        format!("{:032x}", self.issued)
    }
}

pub fn is_hex_token(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
