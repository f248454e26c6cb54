use std::fmt;

const API_SEGMENT: &str = "api";

/// Record kinds the backend exposes as CRUD collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Reports,
    Tasks,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Reports => "reports",
            Collection::Tasks => "tasks",
        }
    }

    /// `GET`/`POST` target, e.g. `/api/reports`.
    pub fn path(&self) -> String {
        format!("/{API_SEGMENT}/{}", self.name())
    }

    /// Path segments of one record, e.g. `["api", "reports", "7"]`.
    ///
    /// `id` stays a single segment; the gateway percent-encodes it.
    pub fn item_segments<'a>(&self, id: &'a str) -> [&'a str; 3] {
        [API_SEGMENT, self.name(), id]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
