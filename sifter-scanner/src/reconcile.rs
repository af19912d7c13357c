use crate::result::{FieldValue, RawRecord, UniformRecord};

/// Union of field names across `records`, in first-seen order
pub fn columns(records: &[RawRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.fields.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

/// Give every record the same columns, filling gaps with the unavailable marker
pub fn reconcile(records: &[RawRecord]) -> Vec<UniformRecord> {
    let columns = columns(records);
    records
        .iter()
        .map(|record| UniformRecord {
            fields: columns
                .iter()
                .map(|column| {
                    let value = record.get(column).cloned().unwrap_or(FieldValue::Unavailable);
                    (column.clone(), value)
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Option<&str>)]) -> RawRecord {
        RawRecord::new(pairs.iter().map(|(k, v)| {
            let value = match v {
                Some(text) => FieldValue::Text(text.to_string()),
                None => FieldValue::Unavailable,
            };
            (k.to_string(), value)
        }))
    }

    #[test]
    fn test_union_in_first_seen_order() {
        let records = vec![
            record(&[("title", Some("a")), ("price", Some("1"))]),
            record(&[("rating", Some("5")), ("title", Some("b"))]),
            record(&[("sku", None)]),
        ];
        assert_eq!(columns(&records), vec!["title", "price", "rating", "sku"]);
    }

    #[test]
    fn test_every_record_has_identical_keys() {
        let records = vec![
            record(&[("title", Some("a")), ("price", Some("1"))]),
            record(&[("rating", Some("5")), ("title", Some("b"))]),
            record(&[]),
        ];
        let uniform = reconcile(&records);
        assert_eq!(uniform.len(), 3);

        for row in &uniform {
            let keys: Vec<&str> = row.keys().collect();
            assert_eq!(keys, vec!["title", "price", "rating"]);
        }
        assert_eq!(uniform[1].get("price"), Some(&FieldValue::Unavailable));
        assert_eq!(uniform[1].get("title"), Some(&FieldValue::Text("b".to_string())));
        assert!(uniform[2].values().all(|v| *v == FieldValue::Unavailable));
    }

    #[test]
    fn test_existing_unavailable_is_preserved() {
        let uniform = reconcile(&[record(&[("price", None), ("title", Some(""))])]);
        assert_eq!(uniform[0].get("price"), Some(&FieldValue::Unavailable));
        assert_eq!(uniform[0].get("title"), Some(&FieldValue::Text(String::new())));
    }

    #[test]
    fn test_empty_record_set() {
        assert!(reconcile(&[]).is_empty());
        assert!(columns(&[]).is_empty());
    }
}
