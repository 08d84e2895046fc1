use ledgerport_core::UserContext;

use super::{finish, FileFormat, FileImporter};
use crate::error::ImportResult;
use crate::importer::{CanonicalImporter, IdentityMaps, ImportedData};
use crate::options::{CustomFormatOptions, CUSTOM_REQUIRED_COLUMNS};
use crate::reader::DelimitedTable;
use crate::table::MappedSemanticTable;

/// Delimited text laid out by the user.
pub struct CustomImporter {
    options: CustomFormatOptions,
}

impl CustomImporter {
    pub fn new(options: CustomFormatOptions) -> ImportResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn from_toml(toml_content: &str) -> ImportResult<Self> {
        Self::new(CustomFormatOptions::from_toml(toml_content)?)
    }
}

impl FileImporter for CustomImporter {
    fn format(&self) -> FileFormat {
        FileFormat::Custom
    }

    fn parse_transactions(
        &self,
        data: &[u8],
        user: &UserContext,
        existing: &IdentityMaps,
    ) -> ImportResult<ImportedData> {
        let options = &self.options;
        let mapping = options.column_mapping();
        let source = DelimitedTable::parse(data, options.delimiter_byte(), options.has_header)?;
        let table = MappedSemanticTable::new(source, &mapping).require(&CUSTOM_REQUIRED_COLUMNS, &mapping)?;
        let importer = CanonicalImporter::new(options.dialect.clone(), options.type_tokens.clone().into())?;
        finish(self.format(), &table, &importer, user, existing)
    }
}
