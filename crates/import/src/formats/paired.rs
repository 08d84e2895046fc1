//! Vendor exports that record each transfer as two single-direction rows
//! joined by a related id, and store balance adjustments as signed
//! "balance was set" rows.

use ledgerport_core::{TransactionType, UserContext};

use super::{finish, FileFormat, FileImporter};
use crate::error::{ImportError, ImportResult};
use crate::importer::{CanonicalImporter, IdentityMaps, ImportedData, TypeMapping};
use crate::options::{ImportOptions, TimezoneSource};
use crate::reader::{DelimitedTable, WorkbookFormat, WorkbookTable};
use crate::table::{
    ColumnMapping, ColumnSource, MappedSemanticTable, PositionalTable, SemanticColumn, SemanticTable,
};
use crate::transfer::{TransferLegTokens, TransferReconciler, RELATED_ID};
use crate::transform::{
    infer_balance_adjustment, normalize_datetime, strip_thousands_separator, BalanceAdjustment,
    RowTransform,
};

const INCOME: &str = "Income";
const EXPENSE: &str = "Expense";
const TRANSFER: &str = "Transfer";
const TRANSFER_OUT: &str = "TransferOut";
const TRANSFER_IN: &str = "TransferIn";
const MODIFY_BALANCE: &str = "ModifyBalance";
const MODIFY_OUTSTANDING: &str = "ModifyOutstanding";

const RELATED_ID_HEADER: &str = "RelatedId";

const REQUIRED: [SemanticColumn; 4] = [
    SemanticColumn::Type,
    SemanticColumn::Time,
    SemanticColumn::AccountName,
    SemanticColumn::Amount,
];

fn column_mapping() -> ColumnMapping {
    ColumnMapping::by_name(&[
        (SemanticColumn::Type, "Type"),
        (SemanticColumn::Time, "Time"),
        (SemanticColumn::Category, "Category"),
        (SemanticColumn::SubCategory, "SubCategory"),
        (SemanticColumn::AccountName, "Account"),
        (SemanticColumn::AccountCurrency, "Currency"),
        (SemanticColumn::Amount, "Amount"),
        (SemanticColumn::Description, "Comment"),
        (SemanticColumn::Tags, "Tags"),
    ])
    .with_extra(RELATED_ID, ColumnSource::Name(RELATED_ID_HEADER.to_string()))
}

fn row_transform() -> RowTransform {
    RowTransform::chain(vec![
        strip_thousands_separator(vec![SemanticColumn::Amount], ','),
        normalize_datetime(SemanticColumn::Time),
        infer_balance_adjustment(BalanceAdjustment {
            asset_token: MODIFY_BALANCE.to_string(),
            liability_token: MODIFY_OUTSTANDING.to_string(),
            income_token: INCOME.to_string(),
            expense_token: EXPENSE.to_string(),
        }),
    ])
}

fn reconciler() -> TransferReconciler {
    TransferReconciler::new(TransferLegTokens {
        out_token: TRANSFER_OUT.to_string(),
        in_token: TRANSFER_IN.to_string(),
        transfer_token: TRANSFER.to_string(),
    })
}

fn type_mapping() -> TypeMapping {
    TypeMapping::new(&[
        (INCOME, TransactionType::Income),
        (EXPENSE, TransactionType::Expense),
        (TRANSFER, TransactionType::Transfer),
    ])
}

fn options() -> ImportOptions {
    ImportOptions {
        timezone: TimezoneSource::UserDefault,
        ..ImportOptions::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedLayout {
    Csv,
    Xlsx,
    Xls,
}

impl PairedLayout {
    fn read(self, data: &[u8]) -> ImportResult<Box<dyn PositionalTable>> {
        Ok(match self {
            PairedLayout::Csv => Box::new(DelimitedTable::parse(data, b',', true)?),
            PairedLayout::Xlsx => Box::new(WorkbookTable::parse(data, WorkbookFormat::Xlsx, true)?),
            PairedLayout::Xls => Box::new(WorkbookTable::parse(data, WorkbookFormat::Xls, true)?),
        })
    }
}

pub struct PairedImporter {
    layout: PairedLayout,
}

impl PairedImporter {
    pub fn new(layout: PairedLayout) -> Self {
        Self { layout }
    }
}

impl FileImporter for PairedImporter {
    fn format(&self) -> FileFormat {
        match self.layout {
            PairedLayout::Csv => FileFormat::PairedCsv,
            PairedLayout::Xlsx => FileFormat::PairedXlsx,
            PairedLayout::Xls => FileFormat::PairedXls,
        }
    }

    fn parse_transactions(
        &self,
        data: &[u8],
        user: &UserContext,
        existing: &IdentityMaps,
    ) -> ImportResult<ImportedData> {
        let mapping = column_mapping();
        let table = MappedSemanticTable::new(self.layout.read(data)?, &mapping)
            .require(&REQUIRED, &mapping)?
            .with_transform(row_transform());
        if table.data_row_count() == 0 {
            return Err(ImportError::NoTransactionData);
        }
        let merged = reconciler().reconcile(&table)?;
        let importer = CanonicalImporter::new(options(), type_mapping())?;
        finish(self.format(), &merged, &importer, user, existing)
    }
}
