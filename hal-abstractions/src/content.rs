//! Static page content served at the root path

/// Provider of the bytes served at `/`
pub trait StaticContent {
    fn index(&self) -> &[u8];
}

impl StaticContent for &[u8] {
    fn index(&self) -> &[u8] {
        self
    }
}

impl StaticContent for &str {
    fn index(&self) -> &[u8] {
        self.as_bytes()
    }
}
