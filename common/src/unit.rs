//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing an entity deletion.
#[derive(Clone, Copy, Debug)]
pub struct Deletion;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing a start of something.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing an end of something.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker type describing a payment.
#[derive(Clone, Copy, Debug)]
pub struct Payment;
