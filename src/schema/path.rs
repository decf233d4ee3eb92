use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Key(String),
    Index(usize),
}

/// The location of a field within a candidate, using host attribute names. Displays as
/// `spec.items[2].name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> FieldPath {
        FieldPath(Vec::with_capacity(8))
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.0.push(Segment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy of this path with the key appended
    pub fn join(&self, key: &str) -> FieldPath {
        let mut joined = self.clone();
        joined.push_key(key);
        joined
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match *segment {
                Segment::Key(ref key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl<'a> From<&'a str> for FieldPath {
    fn from(dotted: &'a str) -> FieldPath {
        let mut path = FieldPath::root();
        for key in dotted.split('.').filter(|k| !k.is_empty()) {
            path.push_key(key);
        }
        path
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn path_displays_keys_and_indexes() {
        let mut path = FieldPath::from("spec.certificate_bundles");
        path.push_index(0);
        path.push_key("name");
        assert_eq!("spec.certificate_bundles[0].name", path.to_string());
        path.pop();
        path.pop();
        assert_eq!("spec.certificate_bundles", path.to_string());
    }

    #[test]
    fn empty_path_displays_as_root() {
        assert_eq!("<root>", FieldPath::root().to_string());
    }
}
