use crate::server::Request;

/// Output of a [`ResponseMarshaler`].
///
/// `status` of `0` leaves the choice to the caller's hint, then to the default
/// (`204` for empty data, `200` otherwise).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marshaled {
    pub data: Vec<u8>,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Marshaled {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A return value that encodes itself.
///
/// Errors are routed to the route's error handler.
pub trait ResponseMarshaler: Send {
    fn marshal(&self, request: &Request) -> anyhow::Result<Marshaled>;
}
