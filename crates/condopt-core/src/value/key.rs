use crate::value::Value;

const KEY_NULL: u8 = 0x00;
const KEY_BOOL: u8 = 0x01;
const KEY_INT: u8 = 0x02;
const KEY_FLOAT: u8 = 0x03;
const KEY_TEXT: u8 = 0x04;
const KEY_LIST: u8 = 0x05;
const KEY_OBJECT: u8 = 0x06;

// Encode value keys with length-prefixed segments to avoid collisions.
pub(super) fn encode_value_key(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.push(KEY_NULL),
        Value::Bool(v) => {
            out.push(KEY_BOOL);
            out.push(u8::from(*v));
        }
        Value::Int(v) => {
            out.push(KEY_INT);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Float(v) => match integral_float(*v) {
            // Integral floats share the integer key so that `1` and `1.0` collide.
            Some(int) => {
                out.push(KEY_INT);
                out.extend_from_slice(&int.to_be_bytes());
            }
            None => {
                out.push(KEY_FLOAT);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
        },
        Value::Text(v) => {
            out.push(KEY_TEXT);
            push_bytes(out, v.as_bytes());
        }
        Value::List(items) => {
            out.push(KEY_LIST);
            push_len(out, items.len());
            for item in items {
                encode_value_key(out, item);
            }
        }
        Value::Object(entries) => {
            let mut sorted = entries.iter().collect::<Vec<_>>();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));

            out.push(KEY_OBJECT);
            push_len(out, sorted.len());
            for (key, value) in sorted {
                push_bytes(out, key.as_bytes());
                encode_value_key(out, value);
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral_float(v: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

    if v.is_finite() && v.fract() == 0.0 && v.abs() <= LIMIT {
        Some(v as i64)
    } else {
        None
    }
}

fn push_len(out: &mut Vec<u8>, len: usize) {
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    out.extend_from_slice(&len.to_be_bytes());
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    push_len(out, bytes.len());
    out.extend_from_slice(bytes);
}
