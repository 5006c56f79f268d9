//! Product records → `{Question, Answer}` pairs.

use crate::output::{ProductRecord, QuestionAnswer};

/// Turn each record into at most two pairs: a features question when the
/// record lists any features, then a price question when the price is
/// non-empty. Record order is preserved.
pub fn flatten_products(records: &[ProductRecord]) -> Vec<QuestionAnswer> {
    let mut pairs = Vec::with_capacity(records.len() * 2);
    for record in records {
        if !record.features.is_empty() {
            pairs.push(QuestionAnswer {
                question: format!("What are the features of {}?", record.name),
                answer: record.features.join(", "),
            });
        }
        if !record.price.is_empty() {
            pairs.push(QuestionAnswer {
                question: format!("How much does {} cost?", record.name),
                answer: record.price.clone(),
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qa(q: &str, a: &str) -> QuestionAnswer {
        QuestionAnswer {
            question: q.into(),
            answer: a.into(),
        }
    }

    fn record(name: &str, features: &[&str], price: &str) -> ProductRecord {
        ProductRecord {
            name: name.into(),
            features: features.iter().map(|f| f.to_string()).collect(),
            price: price.into(),
        }
    }

    #[test]
    fn features_then_price_per_record() {
        let records = vec![
            record("Alpha", &["Fast", "Light"], "$10"),
            record("Beta", &["Strong"], "$20"),
        ];
        assert_eq!(
            flatten_products(&records),
            vec![
                qa("What are the features of Alpha?", "Fast, Light"),
                qa("How much does Alpha cost?", "$10"),
                qa("What are the features of Beta?", "Strong"),
                qa("How much does Beta cost?", "$20"),
            ]
        );
    }

    #[test]
    fn empty_price_gives_one_pair() {
        let pairs = flatten_products(&[record("Alpha", &["Fast"], "")]);
        assert_eq!(pairs, vec![qa("What are the features of Alpha?", "Fast")]);
    }

    #[test]
    fn no_features_gives_price_only() {
        let pairs = flatten_products(&[record("Alpha", &[], "$10")]);
        assert_eq!(pairs, vec![qa("How much does Alpha cost?", "$10")]);
    }

    #[test]
    fn bare_record_gives_nothing() {
        assert!(flatten_products(&[record("Alpha", &[], "")]).is_empty());
        assert!(flatten_products(&[]).is_empty());
    }

    #[test]
    fn deterministic() {
        let records = vec![record("A", &["x", "y"], "1"), record("B", &["z"], "2")];
        assert_eq!(flatten_products(&records), flatten_products(&records));
    }
}
