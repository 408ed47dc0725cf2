//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `crmsync` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad status)   |
//! | 3-9     | recon            | Reconciliation outcome codes             |
//! | 10-19   | config           | Settings file / environment codes        |
//! | 20-29   | sync             | Status push and operation log codes      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
/// For `recon`, every contact is matched.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown `--status` value.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// Both sides fetched; at least one contact is mismatched or one-sided.
pub const EXIT_RECON_DIFFS: u8 = 3;

/// One side failed to fetch; the report covers the other side only.
pub const EXIT_RECON_DEGRADED: u8 = 4;

/// Both sides failed to fetch; nothing was reconciled.
pub const EXIT_RECON_FAILED: u8 = 5;

/// An offline snapshot (`--source-file` / `--crm-file`) is unreadable or
/// not a JSON array of records.
pub const EXIT_RECON_INPUT: u8 = 6;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config file unreadable or invalid TOML, or a bad environment override.
pub const EXIT_CONFIG_INVALID: u8 = 10;

// =============================================================================
// Sync (20-29)
// =============================================================================

/// The upstream write failed. The operation is recorded as `failed`.
pub const EXIT_SYNC_FAILED: u8 = 20;

/// `ops show` was given an id the log does not contain.
pub const EXIT_OPS_NOT_FOUND: u8 = 21;

/// The operation log database could not be opened, read, or written.
pub const EXIT_STORE_ERROR: u8 = 22;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_RECON_DIFFS,
            EXIT_RECON_DEGRADED,
            EXIT_RECON_FAILED,
            EXIT_RECON_INPUT,
            EXIT_CONFIG_INVALID,
            EXIT_SYNC_FAILED,
            EXIT_OPS_NOT_FOUND,
            EXIT_STORE_ERROR,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn recon_codes_in_range() {
        for code in [EXIT_RECON_DIFFS, EXIT_RECON_DEGRADED, EXIT_RECON_FAILED, EXIT_RECON_INPUT] {
            assert!((3..=9).contains(&code));
        }
    }
}
