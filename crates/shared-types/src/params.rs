//! Protocol parameters fixed for every block.

/// Gas limit carried by every block header (30 million gas).
pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Intrinsic gas charged for executing a single action.
///
/// The assembler also uses this as the per-action minimum: once the gas
/// pool drops below it, no further transaction can fit.
pub const ACTION_GAS: u64 = 100_000;

/// Gas charged per byte of action payload.
pub const GAS_PER_PAYLOAD_BYTE: u64 = 68;

/// Maximum byte length of an account name.
pub const MAX_NAME_LENGTH: usize = 31;
