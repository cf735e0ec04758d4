use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of wall-clock time for handlers. All dates and timestamps the
/// server records are naive local values.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> NaiveDateTime + Send + Sync>);

impl Clock {
    pub fn system() -> Self {
        Clock(Arc::new(|| Local::now().naive_local()))
    }

    pub fn fixed(at: NaiveDateTime) -> Self {
        Clock(Arc::new(move || at))
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.0)()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}
