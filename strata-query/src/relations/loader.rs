//! Batched eager loading.
//!
//! Every hop of a requested relation costs one query over the distinct key
//! values of the previous hop's records, no matter how many root records
//! there are. Sibling relations load concurrently. Records are attached only
//! after every query of the request has succeeded.

use futures::future::{BoxFuture, FutureExt, try_join_all};
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use strata_schema::{RelationKind, RelationRef};
use tracing::debug;

use crate::database::Database;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue, ValueKey};
use crate::record::{Loaded, Record};
use crate::sql::Select;

use super::include::IncludeTree;
use super::join::JoinPath;

/// Key values of one hop, each mapped to the root records it came from.
type Frontier = IndexMap<ValueKey, (FilterValue, IndexSet<usize>)>;

/// Load every relation of `tree` onto `records`.
pub(crate) fn load<'a>(
    db: &'a Database,
    model: &'a str,
    records: &'a mut [Record],
    tree: &'a IncludeTree,
) -> BoxFuture<'a, QueryResult<()>> {
    async move {
        if records.is_empty() || tree.is_empty() {
            return Ok(());
        }

        let plans = tree
            .iter()
            .map(|(name, nested)| {
                let r = RelationRef::new(model, name.clone());
                let path = db.plan(|catalog| Ok(JoinPath::resolve(catalog, &r)?))?;
                Ok((name, nested, path))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let parents: &[Record] = &*records;
        let loaded = try_join_all(
            plans
                .iter()
                .map(|(_, nested, path)| fetch_relation(db, parents, path, nested)),
        )
        .await?;

        for ((name, _, _), groups) in plans.iter().zip(loaded) {
            for (record, group) in records.iter_mut().zip(groups) {
                record.attach((*name).clone(), group);
            }
        }
        Ok(())
    }
    .boxed()
}

/// Fetch one relation for all `parents`, returning one entry per parent.
async fn fetch_relation(
    db: &Database,
    parents: &[Record],
    path: &JoinPath,
    nested: &IncludeTree,
) -> QueryResult<Vec<Loaded>> {
    let mut frontier = Frontier::new();
    if let Some(column) = path.root_column() {
        for (index, parent) in parents.iter().enumerate() {
            add_key(&mut frontier, parent.get(column), [index]);
        }
    }

    let mut terminal: Vec<(Record, IndexSet<usize>)> = Vec::new();
    let hops = path.edges().len();
    for (hop, edge) in path.edges().iter().enumerate() {
        if frontier.is_empty() {
            terminal.clear();
            break;
        }
        let model = path
            .model_at(hop)
            .ok_or_else(|| QueryError::internal(format!("{} has no model for hop {}", path.relation(), hop)))?;

        let keys: Vec<FilterValue> = frontier.values().map(|(value, _)| value.clone()).collect();
        let count = keys.len();
        let mut select = Select::from(edge.related_table()).filter(Filter::keys(edge.related_column(), keys));
        if edge.kind == RelationKind::BelongsTo {
            select = select.limit(count);
        }
        debug!(
            relation = %path.relation(),
            hop = %edge.relation,
            keys = count,
            "Eager loading hop"
        );
        let rows = db.execute(&db.grammar().select(&select)).await?.rows;

        let fetched: Vec<(Record, IndexSet<usize>)> = rows
            .into_iter()
            .filter_map(|row| {
                let roots = row
                    .get(edge.related_column())
                    .and_then(|value| frontier.get(&value.key()))
                    .map(|(_, roots)| roots.clone())?;
                Some((Record::persisted(model, row), roots))
            })
            .collect();

        if hop + 1 == hops {
            terminal = fetched;
        } else {
            let next_column = path.edges()[hop + 1].owner_column();
            frontier = Frontier::new();
            for (record, roots) in &fetched {
                add_key(&mut frontier, record.get(next_column), roots.iter().copied());
            }
        }
    }

    if !nested.is_empty() {
        if let Some(target) = path.target_model() {
            let target = SmolStr::new(target);
            let mut records: Vec<Record> = terminal.iter().map(|(record, _)| record.clone()).collect();
            load(db, &target, &mut records, nested).await?;
            for ((record, _), loaded) in terminal.iter_mut().zip(records) {
                *record = loaded;
            }
        }
    }

    let mut groups: Vec<Vec<Record>> = vec![Vec::new(); parents.len()];
    for (record, roots) in terminal {
        for root in roots {
            groups[root].push(record.clone());
        }
    }

    let to_one = path.is_to_one();
    Ok(groups
        .into_iter()
        .map(|group| {
            if to_one {
                Loaded::One(group.into_iter().next().map(Box::new))
            } else {
                Loaded::Many(group)
            }
        })
        .collect())
}

/// Record that `roots` reach `value`. Null and missing keys are skipped.
fn add_key(frontier: &mut Frontier, value: Option<&FilterValue>, roots: impl IntoIterator<Item = usize>) {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return;
    };
    frontier
        .entry(value.key())
        .or_insert_with(|| (value.clone(), IndexSet::new()))
        .1
        .extend(roots);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_key_dedupes_in_first_seen_order() {
        let mut frontier = Frontier::new();
        add_key(&mut frontier, Some(&FilterValue::Int(14)), [0]);
        add_key(&mut frontier, Some(&FilterValue::Int(94)), [1]);
        add_key(&mut frontier, Some(&FilterValue::Int(14)), [1]);
        add_key(&mut frontier, Some(&FilterValue::Null), [2]);
        add_key(&mut frontier, None, [3]);

        let keys: Vec<_> = frontier.values().map(|(v, _)| v.clone()).collect();
        assert_eq!(keys, vec![FilterValue::Int(14), FilterValue::Int(94)]);
        let roots: Vec<usize> = frontier[&FilterValue::Int(14).key()].1.iter().copied().collect();
        assert_eq!(roots, vec![0, 1]);
    }
}
