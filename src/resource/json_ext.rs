use crate::resource::ObjectIdRef;

use serde_json::Value;

pub static NAMESPACE_POINTER: &str = "/metadata/namespace";
pub static NAME_POINTER: &str = "/metadata/name";

/// Accessors for the identity of a candidate supplied by the host, which is needed before the
/// candidate has been validated.
pub trait ResourceJson {
    fn get_namespace(&self) -> Option<&str>;
    fn get_name(&self) -> Option<&str>;

    fn get_id_ref(&self) -> Option<ObjectIdRef> {
        let namespace = self.get_namespace().unwrap_or("");
        let name = self.get_name()?;
        Some(ObjectIdRef::new(namespace, name))
    }
}

fn str_value<'a, 'b>(value: &'a Value, pointer: &'b str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

impl ResourceJson for Value {
    fn get_namespace(&self) -> Option<&str> {
        str_value(self, NAMESPACE_POINTER)
    }

    fn get_name(&self) -> Option<&str> {
        str_value(self, NAME_POINTER)
    }
}
