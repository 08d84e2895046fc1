pub mod error;
pub mod formats;
pub mod importer;
pub mod options;
pub(crate) mod parse;
pub mod reader;
pub mod table;
pub mod transfer;
pub mod transform;

pub use error::{ErrorKind, ImportError, ImportResult};
pub use formats::{CustomImporter, FileFormat, FileImporter, NativeImporter, PairedImporter};
pub use importer::{CanonicalImporter, IdentityMaps, ImportedData, TypeMapping};
pub use options::{CustomFormatOptions, GeoOrder, ImportOptions, TimezoneSource};
pub use transfer::{TransferLegTokens, TransferReconciler};

use ledgerport_core::UserContext;

/// Imports one built-in format in a single call.
pub fn import_file(
    format: FileFormat,
    data: &[u8],
    user: &UserContext,
    existing: &IdentityMaps,
) -> ImportResult<ImportedData> {
    format.importer(None)?.parse_transactions(data, user, existing)
}
