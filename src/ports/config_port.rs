//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn section_keys(&self, section: &str) -> Vec<String>;
}
