use std::collections::HashMap;
use std::fmt;

use crate::annotation::AnnotationTarget;
use crate::printer::Printer;

type CallbackFn<'a> = Box<dyn FnMut(&mut Printer<'a>) -> bool + 'a>;

/// A callback binding. While it runs its slot is empty, which is how a
/// recursive substitution is detected.
pub struct Callback<'a> {
    f: Option<CallbackFn<'a>>,
}

impl<'a> Callback<'a> {
    pub(crate) fn take(&mut self) -> Option<CallbackFn<'a>> {
        self.f.take()
    }

    pub(crate) fn restore(&mut self, f: CallbackFn<'a>) {
        self.f = Some(f);
    }
}

/// What a template variable expands to.
pub enum Value<'a> {
    Text(String),
    /// Emits its own output through the printer. Returning `true` asks the
    /// printer to drop one following character from the consume set.
    Callback(Callback<'a>),
}

impl<'a> Value<'a> {
    pub fn callback(f: impl FnMut(&mut Printer<'a>) -> bool + 'a) -> Self {
        Self::Callback(Callback {
            f: Some(Box::new(f)),
        })
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Value<'_> {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value<'_> {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One frame of variable and annotation bindings.
#[derive(Debug, Default)]
pub struct Vars<'a> {
    pub(crate) values: HashMap<String, Value<'a>>,
    pub(crate) annotations: HashMap<String, AnnotationTarget>,
}

impl<'a> Vars<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value<'a>>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn callback(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&mut Printer<'a>) -> bool + 'a,
    ) -> Self {
        self.values.insert(name.into(), Value::callback(f));
        self
    }

    /// Binds the annotation recorded when a `_start$name$ ... _end$name$`
    /// range closes.
    pub fn annotation(mut self, name: impl Into<String>, target: AnnotationTarget) -> Self {
        self.annotations.insert(name.into(), target);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value<'a>>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.annotations.is_empty()
    }
}

impl<'a, K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Vars<'a> {
    fn from(pairs: [(K, V); N]) -> Self {
        let mut vars = Vars::new();
        for (name, value) in pairs {
            vars.insert(name, value.into());
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_array_forms_agree() {
        let built = Vars::new().set("a", "1").set("b", String::from("2"));
        let from_array = Vars::from([("a", "1"), ("b", "2")]);
        assert_eq!(built.len(), 2);
        assert_eq!(from_array.len(), 2);
        assert!(built.contains("a") && from_array.contains("b"));
    }

    #[test]
    fn annotation_only_frame_is_not_empty() {
        let vars = Vars::new().annotation("name", AnnotationTarget::new("a.proto", vec![4, 0]));
        assert_eq!(vars.len(), 0);
        assert!(!vars.is_empty());
    }

    #[test]
    fn callback_slot_empties_while_taken() {
        let mut value = Value::callback(|_| false);
        let Value::Callback(slot) = &mut value else {
            panic!("expected callback");
        };
        let f = slot.take().unwrap();
        assert!(slot.take().is_none());
        slot.restore(f);
        assert!(slot.take().is_some());
        assert_eq!(format!("{:?}", Value::from("x")), "Text(\"x\")");
    }
}
