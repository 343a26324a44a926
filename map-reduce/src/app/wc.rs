use std::path::Path;

use crate::KeyValue;

/// One `(word, "1")` record per word, where a word is a run of letters.
pub fn map(_filename: &Path, contents: &str) -> Vec<KeyValue> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_letters() {
        let kvs = map(Path::new("x"), "Hello, world!\nhello-again 42");
        let keys: Vec<&str> = kvs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["Hello", "world", "hello", "again"]);
        assert!(kvs.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn counts_values() {
        let values = vec!["1".to_string(); 3];
        assert_eq!(reduce("a", &values), "3");
    }
}
