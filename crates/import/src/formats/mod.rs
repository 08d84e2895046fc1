//! Supported input formats and the importer behind each one.

pub mod custom;
pub mod native;
pub mod paired;

use ledgerport_core::UserContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImportError, ImportResult};
use crate::importer::{CanonicalImporter, IdentityMaps, ImportedData};
use crate::options::CustomFormatOptions;
use crate::table::SemanticTable;

pub use custom::CustomImporter;
pub use native::{NativeImporter, NativeLayout};
pub use paired::{PairedImporter, PairedLayout};

/// One input format: bytes in, new ledger records out.
pub trait FileImporter: Send + Sync {
    fn format(&self) -> FileFormat;

    fn parse_transactions(
        &self,
        data: &[u8],
        user: &UserContext,
        existing: &IdentityMaps,
    ) -> ImportResult<ImportedData>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    NativeCsv,
    NativeTsv,
    NativeXlsx,
    PairedCsv,
    PairedXlsx,
    PairedXls,
    Custom,
}

impl FileFormat {
    pub const ALL: [FileFormat; 7] = [
        FileFormat::NativeCsv,
        FileFormat::NativeTsv,
        FileFormat::NativeXlsx,
        FileFormat::PairedCsv,
        FileFormat::PairedXlsx,
        FileFormat::PairedXls,
        FileFormat::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FileFormat::NativeCsv => "native-csv",
            FileFormat::NativeTsv => "native-tsv",
            FileFormat::NativeXlsx => "native-xlsx",
            FileFormat::PairedCsv => "paired-csv",
            FileFormat::PairedXlsx => "paired-xlsx",
            FileFormat::PairedXls => "paired-xls",
            FileFormat::Custom => "custom",
        }
    }

    /// Builds the importer for this format. Only [`FileFormat::Custom`]
    /// reads `custom`, and it requires it.
    pub fn importer(self, custom: Option<CustomFormatOptions>) -> ImportResult<Box<dyn FileImporter>> {
        let importer: Box<dyn FileImporter> = match self {
            FileFormat::NativeCsv => Box::new(NativeImporter::new(NativeLayout::Csv)),
            FileFormat::NativeTsv => Box::new(NativeImporter::new(NativeLayout::Tsv)),
            FileFormat::NativeXlsx => Box::new(NativeImporter::new(NativeLayout::Xlsx)),
            FileFormat::PairedCsv => Box::new(PairedImporter::new(PairedLayout::Csv)),
            FileFormat::PairedXlsx => Box::new(PairedImporter::new(PairedLayout::Xlsx)),
            FileFormat::PairedXls => Box::new(PairedImporter::new(PairedLayout::Xls)),
            FileFormat::Custom => {
                let options = custom.ok_or_else(|| {
                    ImportError::InvalidOptions("custom format requires layout options".to_string())
                })?;
                Box::new(CustomImporter::new(options)?)
            }
        };
        Ok(importer)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        FileFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or(ImportError::UnsupportedFormat(s))
    }
}

/// Shared tail of every format: run the canonical importer and log a
/// summary.
pub(crate) fn finish(
    format: FileFormat,
    table: &dyn SemanticTable,
    importer: &CanonicalImporter,
    user: &UserContext,
    existing: &IdentityMaps,
) -> ImportResult<ImportedData> {
    if table.data_row_count() == 0 {
        return Err(ImportError::NoTransactionData);
    }
    let data = importer.import(table, user, existing)?;
    tracing::info!(
        format = %format,
        rows = table.data_row_count(),
        transactions = data.transactions.len(),
        new_accounts = data.new_accounts.len(),
        new_categories = data.new_category_count(),
        new_tags = data.new_tags.len(),
        "import finished"
    );
    Ok(data)
}
