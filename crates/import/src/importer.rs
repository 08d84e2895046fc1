//! Turns semantic rows into ledger transactions and the accounts,
//! categories and tags they need.

use chrono::FixedOffset;
use ledgerport_core::{
    currency, Account, AccountRef, Category, CategoryRef, CategoryType, ImportedTransaction, Money,
    Tag, TagRef, TransactionType, UserContext,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ImportError, ImportResult};
use crate::options::{ImportOptions, TimezoneSource};
use crate::parse;
use crate::table::{SemanticColumn, SemanticRow, SemanticTable};

/// Type cell text to transaction type.
#[derive(Debug, Clone, Default)]
pub struct TypeMapping(BTreeMap<String, TransactionType>);

impl TypeMapping {
    pub fn new(tokens: &[(&str, TransactionType)]) -> Self {
        Self(
            tokens
                .iter()
                .map(|(token, kind)| (token.to_string(), *kind))
                .collect(),
        )
    }

    pub fn resolve(&self, token: &str) -> Option<TransactionType> {
        self.0.get(token).copied()
    }
}

impl From<BTreeMap<String, TransactionType>> for TypeMapping {
    fn from(tokens: BTreeMap<String, TransactionType>) -> Self {
        Self(tokens)
    }
}

/// The user's existing records, keyed the way rows reference them.
#[derive(Debug, Clone, Default)]
pub struct IdentityMaps {
    accounts: HashMap<String, Account>,
    /// Secondary name, then primary name. The inner map is ordered so a
    /// lookup without a primary name is deterministic.
    categories: HashMap<CategoryType, HashMap<String, BTreeMap<String, Category>>>,
    tags: HashMap<String, Tag>,
}

impl IdentityMaps {
    pub fn new(
        accounts: impl IntoIterator<Item = Account>,
        categories: impl IntoIterator<Item = Category>,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Self {
        let mut maps = Self::default();
        for account in accounts {
            maps.insert_account(account);
        }
        for category in categories {
            maps.insert_category(category);
        }
        for tag in tags {
            maps.insert_tag(tag);
        }
        maps
    }

    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    /// Exact `(primary, secondary)` match, or with a blank primary the
    /// first category of that secondary name ordered by primary name.
    pub fn category(&self, category_type: CategoryType, primary: &str, secondary: &str) -> Option<&Category> {
        let by_primary = self.categories.get(&category_type)?.get(secondary)?;
        if primary.is_empty() {
            by_primary.values().next()
        } else {
            by_primary.get(primary)
        }
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    fn insert_account(&mut self, account: Account) {
        self.accounts.entry(account.name.clone()).or_insert(account);
    }

    fn insert_category(&mut self, category: Category) {
        self.categories
            .entry(category.category_type)
            .or_default()
            .entry(category.name.clone())
            .or_default()
            .entry(category.parent_name.clone())
            .or_insert(category);
    }

    fn insert_tag(&mut self, tag: Tag) {
        self.tags.entry(tag.name.clone()).or_insert(tag);
    }
}

/// Everything one import produced. Each `new_*` list holds records created
/// during the import, in the order rows first referenced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportedData {
    pub transactions: Vec<ImportedTransaction>,
    pub new_accounts: Vec<Account>,
    pub new_expense_categories: Vec<Category>,
    pub new_income_categories: Vec<Category>,
    pub new_transfer_categories: Vec<Category>,
    pub new_tags: Vec<Tag>,
}

impl ImportedData {
    pub fn new_category_count(&self) -> usize {
        self.new_expense_categories.len()
            + self.new_income_categories.len()
            + self.new_transfer_categories.len()
    }
}

pub struct CanonicalImporter {
    options: ImportOptions,
    types: TypeMapping,
    fixed_offset: Option<FixedOffset>,
}

impl CanonicalImporter {
    pub fn new(options: ImportOptions, types: TypeMapping) -> ImportResult<Self> {
        options.validate()?;
        let fixed_offset = match &options.timezone {
            TimezoneSource::Fixed(text) => parse::parse_timezone(text),
            TimezoneSource::Column | TimezoneSource::UserDefault => None,
        };
        Ok(Self {
            options,
            types,
            fixed_offset,
        })
    }

    /// Imports every valid row of `table`. Any error aborts the whole
    /// import; there is no partial result.
    pub fn import(
        &self,
        table: &dyn SemanticTable,
        user: &UserContext,
        existing: &IdentityMaps,
    ) -> ImportResult<ImportedData> {
        let mut session = ImportSession {
            importer: self,
            user,
            known: existing.clone(),
            data: ImportedData::default(),
        };
        for row in table.rows() {
            let row = row?;
            if row.is_valid() {
                session.import_row(&row)?;
            }
        }
        if session.data.transactions.is_empty() {
            return Err(ImportError::NoTransactionData);
        }
        Ok(session.data)
    }
}

/// Per-call state: the identity maps grow as rows create records.
struct ImportSession<'a> {
    importer: &'a CanonicalImporter,
    user: &'a UserContext,
    known: IdentityMaps,
    data: ImportedData,
}

impl ImportSession<'_> {
    fn options(&self) -> &ImportOptions {
        &self.importer.options
    }

    fn import_row(&mut self, row: &SemanticRow) -> ImportResult<()> {
        let row_id = row.row_id();
        let type_text = row.get(SemanticColumn::Type);
        let transaction_type =
            self.importer
                .types
                .resolve(type_text)
                .ok_or_else(|| ImportError::InvalidTransactionType {
                    row: row_id.to_string(),
                    value: type_text.to_string(),
                })?;

        let time = self.parse_time(row)?;
        let amount = self.parse_amount(row, SemanticColumn::Amount)?;

        let account = self.resolve_account(
            row,
            row.get(SemanticColumn::AccountName),
            row.get(SemanticColumn::AccountCurrency),
        )?;

        let (related_account, related_amount) = if transaction_type == TransactionType::Transfer {
            let related = self.resolve_account(
                row,
                row.get(SemanticColumn::RelatedAccountName),
                row.get(SemanticColumn::RelatedAccountCurrency),
            )?;
            let related_amount = if row.get(SemanticColumn::RelatedAmount).is_empty() {
                amount
            } else {
                self.parse_amount(row, SemanticColumn::RelatedAmount)?
            };
            if related.currency == account.currency && related_amount != amount {
                tracing::warn!(
                    row = %row_id,
                    source = %account.name,
                    destination = %related.name,
                    %amount,
                    %related_amount,
                    "transfer between same-currency accounts has differing amounts"
                );
            }
            (Some(related), Some(related_amount))
        } else {
            (None, None)
        };

        let category = match transaction_type.category_type() {
            Some(category_type) => self.resolve_category(row, category_type)?,
            None => None,
        };

        let tags = parse::split_tags(row.get(SemanticColumn::Tags), self.options().tags_separator)
            .iter()
            .map(|name| self.resolve_tag(name))
            .collect();

        let geo_text = row.get(SemanticColumn::GeoLocation);
        let geo_location =
            parse::parse_geo_location(geo_text, self.options().geo_separator, self.options().geo_order)
                .map_err(|()| ImportError::InvalidGeoLocation {
                    row: row_id.to_string(),
                    value: geo_text.to_string(),
                })?;

        self.data.transactions.push(ImportedTransaction {
            transaction_type,
            time,
            account,
            amount,
            related_account,
            related_amount,
            category,
            tags,
            geo_location,
            comment: row.get(SemanticColumn::Description).to_string(),
        });
        Ok(())
    }

    fn row_offset(&self, row: &SemanticRow) -> ImportResult<FixedOffset> {
        if let Some(offset) = self.importer.fixed_offset {
            return Ok(offset);
        }
        let text = row.get(SemanticColumn::Timezone);
        match self.options().timezone {
            TimezoneSource::Column if !text.is_empty() => {
                parse::parse_timezone(text).ok_or_else(|| ImportError::InvalidTimezone {
                    row: row.row_id().to_string(),
                    value: text.to_string(),
                })
            }
            _ => Ok(self.user.utc_offset()),
        }
    }

    fn parse_time(&self, row: &SemanticRow) -> ImportResult<chrono::DateTime<FixedOffset>> {
        let offset = self.row_offset(row)?;
        let text = row.get(SemanticColumn::Time);
        parse::parse_time(text, &self.options().time_format, offset).ok_or_else(|| {
            ImportError::InvalidTime {
                row: row.row_id().to_string(),
                value: text.to_string(),
            }
        })
    }

    fn parse_amount(&self, row: &SemanticRow, column: SemanticColumn) -> ImportResult<Money> {
        let text = row.get(column);
        let options = self.options();
        parse::parse_amount(text, options.decimal_separator, options.digit_grouping).ok_or_else(|| {
            ImportError::InvalidAmount {
                row: row.row_id().to_string(),
                value: text.to_string(),
            }
        })
    }

    /// First sight of a name records its currency; the row's currency, or
    /// the user's default when the row has none. A later row naming a
    /// different currency for the same account is rejected.
    fn resolve_account(&mut self, row: &SemanticRow, name: &str, currency_text: &str) -> ImportResult<AccountRef> {
        if name.is_empty() {
            return Err(ImportError::AccountNotFound {
                row: row.row_id().to_string(),
                name: name.to_string(),
            });
        }
        if !currency_text.is_empty() && !currency::is_supported(currency_text) {
            return Err(ImportError::InvalidCurrency {
                row: row.row_id().to_string(),
                value: currency_text.to_string(),
            });
        }

        if let Some(account) = self.known.account(name) {
            if !currency_text.is_empty() && currency_text != account.currency {
                return Err(ImportError::AccountCurrencyConflict {
                    row: row.row_id().to_string(),
                    account: name.to_string(),
                    expected: account.currency.clone(),
                    found: currency_text.to_string(),
                });
            }
            return Ok(account_ref(account));
        }

        let currency_code = if currency_text.is_empty() {
            self.user.default_currency.as_str()
        } else {
            currency_text
        };
        let account = Account::new(self.user.uid, name, currency_code).map_err(|_| ImportError::InvalidCurrency {
            row: row.row_id().to_string(),
            value: currency_code.to_string(),
        })?;
        tracing::debug!(account = %name, currency = %currency_code, "new account");
        let reference = account_ref(&account);
        self.known.insert_account(account.clone());
        self.data.new_accounts.push(account);
        Ok(reference)
    }

    fn resolve_category(
        &mut self,
        row: &SemanticRow,
        category_type: CategoryType,
    ) -> ImportResult<Option<CategoryRef>> {
        let primary = row.get(SemanticColumn::Category);
        let secondary = row.get(SemanticColumn::SubCategory);
        if secondary.is_empty() {
            if primary.is_empty() {
                return Ok(None);
            }
            return Err(ImportError::CategoryNotFound {
                row: row.row_id().to_string(),
                name: primary.to_string(),
            });
        }

        if let Some(category) = self.known.category(category_type, primary, secondary) {
            return Ok(Some(category_ref(category)));
        }

        let category = Category::new(self.user.uid, category_type, primary, secondary);
        tracing::debug!(%category_type, primary = %primary, secondary = %secondary, "new category");
        let reference = category_ref(&category);
        self.known.insert_category(category.clone());
        match category_type {
            CategoryType::Expense => self.data.new_expense_categories.push(category),
            CategoryType::Income => self.data.new_income_categories.push(category),
            CategoryType::Transfer => self.data.new_transfer_categories.push(category),
        }
        Ok(Some(reference))
    }

    fn resolve_tag(&mut self, name: &str) -> TagRef {
        if let Some(tag) = self.known.tag(name) {
            return TagRef {
                id: tag.id,
                name: tag.name.clone(),
            };
        }
        let tag = Tag::new(self.user.uid, name);
        tracing::debug!(tag = %name, "new tag");
        self.known.insert_tag(tag.clone());
        self.data.new_tags.push(tag);
        TagRef {
            id: None,
            name: name.to_string(),
        }
    }
}

fn account_ref(account: &Account) -> AccountRef {
    AccountRef {
        id: account.id,
        name: account.name.clone(),
        currency: account.currency.clone(),
    }
}

fn category_ref(category: &Category) -> CategoryRef {
    CategoryRef {
        id: category.id,
        parent_name: category.parent_name.clone(),
        name: category.name.clone(),
    }
}
