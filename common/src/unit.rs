//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing the last modification of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing an expiration of something issued.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing an issuance of something.
#[derive(Clone, Copy, Debug)]
pub struct Issuance;
