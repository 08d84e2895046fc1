//! The ledger's own export layout: one row per transaction, both sides of
//! a transfer on the same row.

use ledgerport_core::{TransactionType, UserContext};

use super::{finish, FileFormat, FileImporter};
use crate::error::ImportResult;
use crate::importer::{CanonicalImporter, IdentityMaps, ImportedData, TypeMapping};
use crate::options::ImportOptions;
use crate::reader::{DelimitedTable, WorkbookFormat, WorkbookTable};
use crate::table::{ColumnMapping, MappedSemanticTable, PositionalTable, SemanticColumn};

pub const HEADERS: [&str; 14] = [
    "Time",
    "Timezone",
    "Type",
    "Category",
    "Sub Category",
    "Account",
    "Account Currency",
    "Amount",
    "Account2",
    "Account2 Currency",
    "Account2 Amount",
    "Geographic Location",
    "Tags",
    "Description",
];

const REQUIRED: [SemanticColumn; 5] = [
    SemanticColumn::Time,
    SemanticColumn::Type,
    SemanticColumn::SubCategory,
    SemanticColumn::AccountName,
    SemanticColumn::Amount,
];

fn column_mapping() -> ColumnMapping {
    let columns = [
        SemanticColumn::Time,
        SemanticColumn::Timezone,
        SemanticColumn::Type,
        SemanticColumn::Category,
        SemanticColumn::SubCategory,
        SemanticColumn::AccountName,
        SemanticColumn::AccountCurrency,
        SemanticColumn::Amount,
        SemanticColumn::RelatedAccountName,
        SemanticColumn::RelatedAccountCurrency,
        SemanticColumn::RelatedAmount,
        SemanticColumn::GeoLocation,
        SemanticColumn::Tags,
        SemanticColumn::Description,
    ];
    let pairs: Vec<(SemanticColumn, &str)> = columns.into_iter().zip(HEADERS).collect();
    ColumnMapping::by_name(&pairs)
}

fn type_mapping() -> TypeMapping {
    TypeMapping::new(&[
        ("Balance Modification", TransactionType::ModifyBalance),
        ("Income", TransactionType::Income),
        ("Expense", TransactionType::Expense),
        ("Transfer", TransactionType::Transfer),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeLayout {
    Csv,
    Tsv,
    Xlsx,
}

impl NativeLayout {
    fn read(self, data: &[u8]) -> ImportResult<Box<dyn PositionalTable>> {
        Ok(match self {
            NativeLayout::Csv => Box::new(DelimitedTable::parse(data, b',', true)?),
            NativeLayout::Tsv => Box::new(DelimitedTable::parse(data, b'\t', true)?),
            NativeLayout::Xlsx => Box::new(WorkbookTable::parse(data, WorkbookFormat::Xlsx, true)?),
        })
    }
}

pub struct NativeImporter {
    layout: NativeLayout,
}

impl NativeImporter {
    pub fn new(layout: NativeLayout) -> Self {
        Self { layout }
    }
}

impl FileImporter for NativeImporter {
    fn format(&self) -> FileFormat {
        match self.layout {
            NativeLayout::Csv => FileFormat::NativeCsv,
            NativeLayout::Tsv => FileFormat::NativeTsv,
            NativeLayout::Xlsx => FileFormat::NativeXlsx,
        }
    }

    fn parse_transactions(
        &self,
        data: &[u8],
        user: &UserContext,
        existing: &IdentityMaps,
    ) -> ImportResult<ImportedData> {
        let mapping = column_mapping();
        let table = MappedSemanticTable::new(self.layout.read(data)?, &mapping).require(&REQUIRED, &mapping)?;
        let importer = CanonicalImporter::new(ImportOptions::default(), type_mapping())?;
        finish(self.format(), &table, &importer, user, existing)
    }
}
