use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::RunConfig;
use crate::period::period_index;
use crate::similarity::is_similar;
use crate::Transaction;

/// One statement line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl From<&Transaction> for Entry {
    fn from(transaction: &Transaction) -> Self {
        Self {
            date: transaction.date,
            description: transaction.description.clone(),
            debit: transaction.debit,
            credit: transaction.credit,
        }
    }
}

/// Transactions judged to share a payee.
///
/// Whether a group sums or itemizes is decided when it is created and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group {
    /// Running totals, dated and described by the first transaction of the group
    Aggregate(Entry),
    /// Every transaction, in arrival order
    Itemized(Vec<Entry>),
}

impl Group {
    fn add(&mut self, transaction: &Transaction) {
        match self {
            Group::Aggregate(total) => {
                total.debit += transaction.debit;
                total.credit += transaction.credit;
            }
            Group::Itemized(entries) => entries.push(transaction.into()),
        }
    }

    /// Statement lines the group expands to
    pub fn entries(&self) -> &[Entry] {
        match self {
            Group::Aggregate(total) => std::slice::from_ref(total),
            Group::Itemized(entries) => entries,
        }
    }
}

/// Groups of a bucket, keyed by the lower-cased description of their first transaction, in
/// creation order.
///
/// Matching is approximate, so lookups are a linear scan rather than a hash lookup: classifying
/// a bucket is quadratic in its number of groups, which is fine for a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups(Vec<(String, Group)>);

impl Groups {
    fn add(&mut self, transaction: &Transaction, config: &RunConfig) {
        let description = transaction.description.to_lowercase();
        match self
            .0
            .iter_mut()
            .find(|(key, _)| is_similar(key, &description))
        {
            Some((_, group)) => group.add(transaction),
            None => {
                let group = if config.is_excluded(&description) {
                    Group::Itemized(vec![transaction.into()])
                } else {
                    Group::Aggregate(transaction.into())
                };
                tracing::debug!("New group '{description}': {group:?}");
                self.0.push((description, group));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Groups in creation order, or by key when `sorted`
    pub fn ordered(&self, sorted: bool) -> Vec<&Group> {
        let mut groups: Vec<&(String, Group)> = self.0.iter().collect();
        if sorted {
            groups.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// Number of statement lines the groups expand to
    pub fn line_count(&self) -> usize {
        self.0.iter().map(|(_, group)| group.entries().len()).sum()
    }
}

/// The debit and credit groups of one period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodBucket {
    pub credit: Groups,
    pub debit: Groups,
}

impl PeriodBucket {
    /// Adds a transaction to the debit groups if it has a debit amount, to the credit groups
    /// otherwise
    pub fn add(&mut self, transaction: &Transaction, config: &RunConfig) {
        if transaction.debit.is_zero() {
            self.credit.add(transaction, config);
        } else {
            self.debit.add(transaction, config);
        }
    }
}

/// Distributes transactions over the configured periods, one bucket per period.
///
/// Transactions outside every period are dropped.
pub fn classify<'t>(
    transactions: impl IntoIterator<Item = &'t Transaction>,
    config: &RunConfig,
) -> Vec<PeriodBucket> {
    let mut buckets = vec![PeriodBucket::default(); config.periods.len()];
    for transaction in transactions {
        match period_index(transaction.date, &config.periods) {
            Some(index) => buckets[index].add(transaction, config),
            None => tracing::debug!(
                "Dropping transaction outside of every period: {transaction:?}"
            ),
        }
    }
    for (period, bucket) in config.periods.iter().zip(&buckets) {
        if bucket.credit.is_empty() && bucket.debit.is_empty() {
            tracing::info!("No transaction in period {}", period.label());
        }
    }
    buckets
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::Settings;

    fn config(periods: &[[&str; 2]], exclusions: &str) -> RunConfig {
        Settings {
            periods: periods
                .iter()
                .map(|[start, end]| [start.to_string(), end.to_string()])
                .collect(),
            exclusions: exclusions.to_owned(),
            ..Settings::default()
        }
        .resolve()
        .expect("config")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn transaction(day: u32, description: &str, debit: Decimal, credit: Decimal) -> Transaction {
        Transaction {
            date: date(2024, 1, day),
            description: description.to_owned(),
            debit,
            credit,
        }
    }

    const JANUARY: [&str; 2] = ["2024-01-01", "2024-01-31"];

    #[test]
    fn should_aggregate_similar_descriptions() {
        let transactions = [
            transaction(5, "Coffee Shop A", dec!(4.50), dec!(0)),
            transaction(6, "Coffee Shop A #2", dec!(4.75), dec!(0)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], ""));
        assert_eq!(
            vec![&Group::Aggregate(Entry {
                date: date(2024, 1, 5),
                description: "Coffee Shop A".to_owned(),
                debit: dec!(9.25),
                credit: dec!(0),
            })],
            buckets[0].debit.ordered(false)
        );
        assert!(buckets[0].credit.is_empty());
    }

    #[test]
    fn should_sum_totals_whatever_the_arrival_order() {
        let config = config(&[JANUARY], "");
        for amounts in [[10, 20, 30], [30, 10, 20], [20, 30, 10]] {
            let transactions = amounts.map(|amount| {
                transaction(1, "Electric Company", Decimal::from(amount), dec!(0))
            });
            let buckets = classify(&transactions, &config);
            let groups = buckets[0].debit.ordered(false);
            assert_eq!(1, groups.len());
            assert_eq!(dec!(60), groups[0].entries()[0].debit);
        }
    }

    #[test]
    fn should_itemize_excluded_descriptions() {
        let transactions = [
            transaction(3, "Wire Transfer ACH", dec!(50), dec!(0)),
            transaction(4, "Wire Transfer Online", dec!(75), dec!(0)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], "transfer"));
        assert_eq!(
            vec![&Group::Itemized(vec![
                Entry::from(&transactions[0]),
                Entry::from(&transactions[1]),
            ])],
            buckets[0].debit.ordered(false)
        );
        assert_eq!(2, buckets[0].debit.line_count());
    }

    #[test]
    fn should_keep_itemized_rows_in_arrival_order() {
        let transactions = [
            transaction(9, "ATM Withdrawal 001", dec!(30), dec!(0)),
            transaction(2, "ATM Withdrawal 002", dec!(10), dec!(0)),
            transaction(5, "ATM Withdrawal 003", dec!(20), dec!(0)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], "atm"));
        let amounts: Vec<Decimal> = buckets[0].debit.ordered(false)[0]
            .entries()
            .iter()
            .map(|entry| entry.debit)
            .collect();
        assert_eq!(vec![dec!(30), dec!(10), dec!(20)], amounts);
    }

    #[test]
    fn should_only_itemize_when_the_first_description_is_excluded() {
        // The group is keyed and typed by "acme payroll", later matches are summed
        let transactions = [
            transaction(1, "ACME Payroll", dec!(0), dec!(1000)),
            transaction(15, "ACME Payroll Transfer", dec!(0), dec!(1000)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], "transfer"));
        assert_eq!(
            vec![&Group::Aggregate(Entry {
                date: date(2024, 1, 1),
                description: "ACME Payroll".to_owned(),
                debit: dec!(0),
                credit: dec!(2000),
            })],
            buckets[0].credit.ordered(false)
        );
    }

    #[test]
    fn should_classify_transactions_with_both_amounts_as_debits() {
        let transactions = [transaction(1, "Odd", dec!(3), dec!(4))];
        let buckets = classify(&transactions, &config(&[JANUARY], ""));
        assert_eq!(1, buckets[0].debit.ordered(false).len());
        assert!(buckets[0].credit.is_empty());
    }

    #[test]
    fn should_join_the_oldest_matching_group() {
        let transactions = [
            transaction(1, "amazon.com*1111111", dec!(1), dec!(0)),
            transaction(2, "amazon.com*2222222", dec!(2), dec!(0)),
            transaction(3, "Grocer", dec!(4), dec!(0)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], ""));
        let groups = buckets[0].debit.ordered(false);
        assert_eq!(2, groups.len());
        assert_eq!(dec!(3), groups[0].entries()[0].debit);
    }

    #[test]
    fn should_drop_transactions_outside_every_period() {
        let transactions = [
            transaction(5, "Coffee", dec!(1), dec!(0)),
            Transaction {
                date: date(2024, 2, 1),
                ..transaction(1, "Coffee", dec!(1), dec!(0))
            },
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], ""));
        assert_eq!(1, buckets.len());
        assert_eq!(dec!(1), buckets[0].debit.ordered(false)[0].entries()[0].debit);
    }

    #[test]
    fn should_sort_groups_by_key() {
        let transactions = [
            transaction(1, "Zoo", dec!(1), dec!(0)),
            transaction(2, "apple store", dec!(1), dec!(0)),
        ];
        let buckets = classify(&transactions, &config(&[JANUARY], ""));
        let descriptions = |sorted| {
            buckets[0]
                .debit
                .ordered(sorted)
                .into_iter()
                .map(|group| group.entries()[0].description.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(vec!["Zoo", "apple store"], descriptions(false));
        assert_eq!(vec!["apple store", "Zoo"], descriptions(true));
    }
}
