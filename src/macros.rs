/// Compile a regex literal once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Tags`](crate::osm::Tags) map: `tags! { "highway" => "primary" }`.
#[macro_export]
macro_rules! tags {
    () => {
        $crate::osm::Tags::new()
    };
    ( $($k:expr => $v:expr),+ $(,)? ) => {{
        let mut tags = $crate::osm::Tags::new();
        $( tags.insert($k, $v); )+
        tags
    }};
}
