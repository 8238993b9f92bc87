use serde::Deserialize;

/// Success body of a resource endpoint.
///
/// Some endpoints wrap their result as `{ "success": true, "data": ... }`,
/// others return the object bare. Both decode to the same value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(value) => value,
        }
    }
}
