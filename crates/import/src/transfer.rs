//! Pairs single-direction transfer legs into bidirectional transfers.

use std::collections::HashMap;

use crate::error::{ImportError, ImportResult};
use crate::table::{BufferedSemanticTable, SemanticColumn, SemanticRow, SemanticTable};

/// Extra-column key that carries the pairing id of a transfer leg.
pub const RELATED_ID: &str = "related_id";

/// Type tokens the reconciler recognises and emits.
#[derive(Debug, Clone)]
pub struct TransferLegTokens {
    pub out_token: String,
    pub in_token: String,
    /// Type written on merged rows.
    pub transfer_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegDirection {
    Out,
    In,
}

#[derive(Debug)]
struct TransferLeg {
    direction: LegDirection,
    row: SemanticRow,
}

/// Unmatched legs keyed by related id. Slots keep first-seen order so
/// leftovers can be reported deterministically.
#[derive(Debug, Default)]
struct PendingLegs {
    slots: Vec<Option<(String, TransferLeg)>>,
    by_id: HashMap<String, usize>,
}

impl PendingLegs {
    fn take(&mut self, related_id: &str) -> Option<TransferLeg> {
        let slot = self.by_id.remove(related_id)?;
        self.slots[slot].take().map(|(_, leg)| leg)
    }

    fn hold(&mut self, related_id: &str, leg: TransferLeg) {
        self.by_id.insert(related_id.to_string(), self.slots.len());
        self.slots.push(Some((related_id.to_string(), leg)));
    }

    fn remaining_ids(self) -> Vec<String> {
        self.slots.into_iter().flatten().map(|(id, _)| id).collect()
    }
}

pub struct TransferReconciler {
    tokens: TransferLegTokens,
}

impl TransferReconciler {
    pub fn new(tokens: TransferLegTokens) -> Self {
        Self { tokens }
    }

    fn direction(&self, row: &SemanticRow) -> Option<LegDirection> {
        let kind = row.get(SemanticColumn::Type);
        if kind == self.tokens.out_token {
            Some(LegDirection::Out)
        } else if kind == self.tokens.in_token {
            Some(LegDirection::In)
        } else {
            None
        }
    }

    /// Reads every row of `table`, forwarding non-transfer rows unchanged and
    /// emitting one merged row per completed pair at the position its second
    /// leg arrived. Invalid rows are dropped.
    pub fn reconcile(&self, table: &dyn SemanticTable) -> ImportResult<BufferedSemanticTable> {
        let mut output = BufferedSemanticTable::new(merged_columns(table));
        let mut pending = PendingLegs::default();

        for row in table.rows() {
            let row = row?;
            if !row.is_valid() {
                continue;
            }
            let Some(direction) = self.direction(&row) else {
                output.push(row);
                continue;
            };

            let related_id = row.extra(RELATED_ID).to_string();
            if related_id.is_empty() {
                return Err(ImportError::MissingRelatedId {
                    row: row.row_id().to_string(),
                });
            }

            let leg = TransferLeg { direction, row };
            match pending.take(&related_id) {
                None => {
                    tracing::debug!(related_id = %related_id, ?direction, "holding transfer leg");
                    pending.hold(&related_id, leg);
                }
                Some(mate) if mate.direction == leg.direction => {
                    return Err(ImportError::TransferDirectionConflict {
                        row: leg.row.row_id().to_string(),
                        related_id,
                    });
                }
                Some(mate) => {
                    let (out_leg, in_leg) = match leg.direction {
                        LegDirection::Out => (leg, mate),
                        LegDirection::In => (mate, leg),
                    };
                    output.push(self.merge(out_leg.row, &in_leg.row));
                }
            }
        }

        let unpaired = pending.remaining_ids();
        if !unpaired.is_empty() {
            return Err(ImportError::UnpairedTransfers(unpaired));
        }
        Ok(output)
    }

    /// The out leg supplies the source side and shared fields; the in leg
    /// supplies the destination and fills shared fields the out leg left blank.
    fn merge(&self, mut merged: SemanticRow, in_row: &SemanticRow) -> SemanticRow {
        merged.set(SemanticColumn::Type, self.tokens.transfer_token.clone());

        let destination = [
            (SemanticColumn::AccountName, SemanticColumn::RelatedAccountName),
            (SemanticColumn::AccountCurrency, SemanticColumn::RelatedAccountCurrency),
            (SemanticColumn::Amount, SemanticColumn::RelatedAmount),
        ];
        for (from, to) in destination {
            if in_row.has(from) {
                merged.set(to, in_row.get(from));
            }
        }

        for column in [
            SemanticColumn::Category,
            SemanticColumn::SubCategory,
            SemanticColumn::Description,
            SemanticColumn::Tags,
        ] {
            if merged.get(column).is_empty() && !in_row.get(column).is_empty() {
                merged.set(column, in_row.get(column));
            }
        }
        merged
    }
}

fn merged_columns(table: &dyn SemanticTable) -> Vec<SemanticColumn> {
    let mut columns: Vec<SemanticColumn> = SemanticColumn::ALL
        .into_iter()
        .filter(|column| table.has_column(*column))
        .collect();
    for (from, to) in [
        (SemanticColumn::AccountName, SemanticColumn::RelatedAccountName),
        (SemanticColumn::AccountCurrency, SemanticColumn::RelatedAccountCurrency),
        (SemanticColumn::Amount, SemanticColumn::RelatedAmount),
    ] {
        if table.has_column(from) {
            columns.push(to);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TransferLegTokens {
        TransferLegTokens {
            out_token: "TransferOut".to_string(),
            in_token: "TransferIn".to_string(),
            transfer_token: "Transfer".to_string(),
        }
    }

    fn leg(id: &str, kind: &str, account: &str, amount: &str, related: &str) -> SemanticRow {
        let mut row = SemanticRow::new(id)
            .with(SemanticColumn::Type, kind)
            .with(SemanticColumn::Time, "2024-09-01 23:59:59")
            .with(SemanticColumn::SubCategory, "Cat3")
            .with(SemanticColumn::AccountName, account)
            .with(SemanticColumn::Amount, amount)
            .with(SemanticColumn::Description, "");
        row.set_extra(RELATED_ID, related);
        row
    }

    fn table(rows: Vec<SemanticRow>) -> BufferedSemanticTable {
        let mut table = BufferedSemanticTable::default();
        for row in rows {
            table.push(row);
        }
        table
    }

    fn reconcile(rows: Vec<SemanticRow>) -> ImportResult<Vec<SemanticRow>> {
        let output = TransferReconciler::new(tokens()).reconcile(&table(rows))?;
        output.rows().collect()
    }

    fn strip_row_id(row: &SemanticRow) -> Vec<(SemanticColumn, String)> {
        row.columns().map(|c| (c, row.get(c).to_string())).collect()
    }

    #[test]
    fn merges_out_then_in() {
        let rows = reconcile(vec![
            leg("1", "TransferOut", "A", "0.05", "R1"),
            leg("2", "TransferIn", "B", "0.05", "R1"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        let merged = &rows[0];
        assert_eq!(merged.get(SemanticColumn::Type), "Transfer");
        assert_eq!(merged.get(SemanticColumn::AccountName), "A");
        assert_eq!(merged.get(SemanticColumn::RelatedAccountName), "B");
        assert_eq!(merged.get(SemanticColumn::Amount), "0.05");
        assert_eq!(merged.get(SemanticColumn::RelatedAmount), "0.05");
        assert_eq!(merged.get(SemanticColumn::SubCategory), "Cat3");
    }

    #[test]
    fn leg_order_does_not_matter() {
        let forward = reconcile(vec![
            leg("1", "TransferOut", "A", "10", "R1"),
            leg("2", "TransferIn", "B", "9", "R1"),
        ])
        .unwrap();
        let backward = reconcile(vec![
            leg("1", "TransferIn", "B", "9", "R1"),
            leg("2", "TransferOut", "A", "10", "R1"),
        ])
        .unwrap();
        assert_eq!(strip_row_id(&forward[0]), strip_row_id(&backward[0]));
        assert_eq!(backward[0].get(SemanticColumn::AccountName), "A");
    }

    #[test]
    fn non_transfer_rows_pass_through_in_order() {
        let income = SemanticRow::new("0")
            .with(SemanticColumn::Type, "Income")
            .with(SemanticColumn::Amount, "1");
        let rows = reconcile(vec![
            leg("1", "TransferOut", "A", "5", "R1"),
            income.clone(),
            leg("2", "TransferIn", "B", "5", "R1"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], income);
        assert_eq!(rows[1].get(SemanticColumn::Type), "Transfer");
    }

    #[test]
    fn invalid_rows_are_dropped() {
        let rows = reconcile(vec![SemanticRow::invalid("0")]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn blank_related_id_is_an_error() {
        let result = reconcile(vec![leg("7", "TransferOut", "A", "5", "")]);
        assert!(matches!(result, Err(ImportError::MissingRelatedId { row }) if row == "7"));
    }

    #[test]
    fn same_direction_pair_is_an_error() {
        let result = reconcile(vec![
            leg("1", "TransferOut", "A", "5", "R1"),
            leg("2", "TransferOut", "B", "5", "R1"),
        ]);
        assert!(matches!(
            result,
            Err(ImportError::TransferDirectionConflict { related_id, .. }) if related_id == "R1"
        ));
    }

    #[test]
    fn leftover_legs_are_all_listed() {
        let result = reconcile(vec![
            leg("1", "TransferOut", "A", "5", "R9"),
            leg("2", "TransferOut", "A", "5", "R1"),
            leg("3", "TransferIn", "B", "5", "R1"),
            leg("4", "TransferIn", "C", "5", "R4"),
        ]);
        match result {
            Err(ImportError::UnpairedTransfers(ids)) => assert_eq!(ids, ["R9", "R4"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reused_id_after_resolution_pairs_again() {
        let rows = reconcile(vec![
            leg("1", "TransferOut", "A", "5", "R1"),
            leg("2", "TransferIn", "B", "5", "R1"),
            leg("3", "TransferIn", "D", "7", "R1"),
            leg("4", "TransferOut", "C", "7", "R1"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get(SemanticColumn::AccountName), "C");
        assert_eq!(rows[1].get(SemanticColumn::RelatedAccountName), "D");
    }

    #[test]
    fn merged_fills_blank_shared_fields_from_in_leg() {
        let out = leg("1", "TransferOut", "A", "5", "R1").with(SemanticColumn::Description, "");
        let inn = leg("2", "TransferIn", "B", "5", "R1").with(SemanticColumn::Description, "rent");
        let rows = reconcile(vec![out, inn]).unwrap();
        assert_eq!(rows[0].get(SemanticColumn::Description), "rent");
    }

    #[test]
    fn output_reports_related_columns() {
        let output = TransferReconciler::new(tokens())
            .reconcile(&table(vec![leg("1", "Income", "A", "1", "")]))
            .unwrap();
        assert!(output.has_column(SemanticColumn::RelatedAccountName));
        assert!(output.has_column(SemanticColumn::RelatedAmount));
        assert!(!output.has_column(SemanticColumn::RelatedAccountCurrency));
    }
}
