//! Benchmark utilities.

use mapview_collate::Value;

/// Generates a deterministic batch of (doc ID, emitted keys) pairs.
pub fn generate_documents(count: usize, keys_per_doc: usize) -> Vec<(Vec<u8>, Vec<Value>)> {
    (0..count)
        .map(|doc| {
            let doc_id = format!("doc-{doc:08}").into_bytes();
            let keys = (0..keys_per_doc)
                .map(|key| Value::Text(format!("key-{:04}", (doc * 31 + key * 7) % 1000)))
                .collect();
            (doc_id, keys)
        })
        .collect()
}

/// Generates a deterministic nested collatable value.
pub fn nested_value(depth: usize, width: usize) -> Value {
    if depth == 0 {
        Value::Text("leaf".into())
    } else {
        Value::Array(
            (0..width)
                .map(|i| {
                    Value::Array(vec![
                        Value::Int(i as i64),
                        nested_value(depth - 1, width),
                    ])
                })
                .collect(),
        )
    }
}
