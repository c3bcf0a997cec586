use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable key for a service type, including trait objects (`dyn Trait`).
///
/// Equality and hashing use the `TypeId`; the `type_name` is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully-qualified type name, e.g. `my_app::clients::SearchClient`.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with every module path stripped, e.g. `SearchClient`.
    #[must_use]
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strips module paths from every path segment of a `type_name` string.
///
/// `a::b::Search<c::D, e::F>` becomes `Search<D, F>` and `dyn a::Api` becomes `Api`.
#[must_use]
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.truncate(segment_start);
            }
            c if c.is_alphanumeric() || c == '_' => out.push(c),
            c => {
                out.push(c);
                segment_start = out.len();
            }
        }
    }

    match out.strip_prefix("dyn ") {
        Some(rest) => rest.to_owned(),
        None => out,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    mod outer {
        pub struct Search<T>(pub T);
        pub trait Api {}
    }

    #[test]
    fn short_name_strips_module_paths() {
        assert_eq!(short_type_name("a::b::Search"), "Search");
        assert_eq!(short_type_name("Search"), "Search");
        assert_eq!(short_type_name("a::Search<b::c::D, e::F>"), "Search<D, F>");
        assert_eq!(short_type_name("dyn a::Api"), "Api");
        assert_eq!(short_type_name("(a::X, &b::Y)"), "(X, &Y)");
    }

    #[test]
    fn type_key_compares_by_type_not_name() {
        assert_eq!(TypeKey::of::<u32>(), TypeKey::of::<u32>());
        assert_ne!(TypeKey::of::<u32>(), TypeKey::of::<i32>());
        assert_eq!(
            TypeKey::of::<outer::Search<String>>().short_name(),
            "Search<String>"
        );
        assert_eq!(TypeKey::of::<dyn outer::Api>().short_name(), "Api");
    }
}
