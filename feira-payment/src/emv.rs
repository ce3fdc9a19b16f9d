//! EMV "copy and paste" payload for PIX charges, per the BR Code spec:
//! TLV fields with two-digit ids and lengths, closed by a CRC-16 checksum.

/// Inputs for one payload. Name and city are normalized here; the
/// transaction id lands in the additional-data template (field 62).
#[derive(Debug, Clone)]
pub struct EmvPayload {
    pub pix_key: String,
    pub description: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub amount_cents: i64,
    pub transaction_id: String,
}

/// Longest byte slice of `value` that fits `max` without splitting a
/// UTF-8 character.
fn clamp_bytes(value: &str, max: usize) -> &str {
    let mut end = value.len().min(max);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// TLV lengths are two decimal digits, so a value never exceeds 99 bytes.
fn field(id: &str, value: &str) -> String {
    let value = clamp_bytes(value, 99);
    format!("{id}{:02}{value}", value.len())
}

fn truncate_upper(value: &str, max: usize) -> String {
    value.to_uppercase().chars().take(max).collect()
}

/// CRC-16/CCITT-FALSE: init 0xFFFF, polynomial 0x1021, no reflection.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

pub fn build_payload(input: &EmvPayload) -> String {
    let mut merchant_account = String::new();
    merchant_account.push_str(&field("00", "br.gov.bcb.pix"));
    merchant_account.push_str(&field("01", &input.pix_key));
    if !input.description.is_empty() {
        // The whole merchant-account template is itself a TLV value, so the
        // description gets whatever of the 99-byte ceiling the key left over.
        let budget = 99usize.saturating_sub(merchant_account.len() + 4);
        let description: String = input.description.chars().take(72).collect();
        let description = clamp_bytes(&description, budget);
        if !description.is_empty() {
            merchant_account.push_str(&field("02", description));
        }
    }

    let amount = format!("{}.{:02}", input.amount_cents / 100, input.amount_cents % 100);
    let txid: String = input.transaction_id.chars().take(25).collect();
    let additional_data = field("05", &txid);

    let mut payload = String::new();
    payload.push_str(&field("00", "01"));
    payload.push_str(&field("01", "12"));
    payload.push_str(&field("26", &merchant_account));
    payload.push_str(&field("52", "0000"));
    payload.push_str(&field("53", "986"));
    payload.push_str(&field("54", &amount));
    payload.push_str(&field("58", "BR"));
    payload.push_str(&field("59", &truncate_upper(&input.merchant_name, 25)));
    payload.push_str(&field("60", &truncate_upper(&input.merchant_city, 15)));
    payload.push_str(&field("62", &additional_data));

    payload.push_str("6304");
    let crc = crc16_ccitt(payload.as_bytes());
    payload.push_str(&format!("{crc:04X}"));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_known_vector() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_payload_structure() {
        let payload = build_payload(&EmvPayload {
            pix_key: "12345678901".to_string(),
            description: "Pedido ORD-1".to_string(),
            merchant_name: "Fornecedora Alfa Ltda".to_string(),
            merchant_city: "Sao Paulo".to_string(),
            amount_cents: 450_000,
            transaction_id: "FRA12345678ABCDEF01".to_string(),
        });

        assert!(payload.starts_with("000201"));
        assert!(payload.contains("0014br.gov.bcb.pix"));
        assert!(payload.contains("011112345678901"));
        assert!(payload.contains("52040000"));
        assert!(payload.contains("5303986"));
        assert!(payload.contains("54074500.00"));
        assert!(payload.contains("5802BR"));
        assert!(payload.contains("5921FORNECEDORA ALFA LTDA"));
        assert!(payload.contains("6009SAO PAULO"));
        assert!(payload.contains("0519FRA12345678ABCDEF01"));

        // Closing CRC field: trailing four hex chars verify against the rest.
        let (body, crc) = payload.split_at(payload.len() - 4);
        assert!(body.ends_with("6304"));
        assert_eq!(crc, format!("{:04X}", crc16_ccitt(body.as_bytes())));
    }

    #[test]
    fn test_merchant_name_truncated_to_25() {
        let payload = build_payload(&EmvPayload {
            pix_key: "12345678901".to_string(),
            description: String::new(),
            merchant_name: "Distribuidora de Insumos Agricolas do Vale Ltda".to_string(),
            merchant_city: "Belo Horizonte".to_string(),
            amount_cents: 100,
            transaction_id: "FRA00000000AAAAAAAA".to_string(),
        });
        assert!(payload.contains("5925DISTRIBUIDORA DE INSUMOS "));
    }

    // Walks the top-level TLV stream, asserting each declared length covers
    // exactly the bytes that follow and nothing is left over.
    fn assert_well_formed(payload: &str) {
        let bytes = payload.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            let len: usize = payload[pos + 2..pos + 4].parse().unwrap();
            assert!(len <= 99);
            assert!(payload.is_char_boundary(pos + 4 + len));
            pos += 4 + len;
        }
        assert_eq!(pos, bytes.len());
    }

    #[test]
    fn test_long_multibyte_description_keeps_lengths_two_digits() {
        // 72 chars of two-byte "ç" alongside a long email key would push the
        // merchant-account template past a two-digit length if unclamped.
        let payload = build_payload(&EmvPayload {
            pix_key: "contas.a.receber.fornecedora@pagamentos.exemplo.com.br".to_string(),
            description: "ç".repeat(72),
            merchant_name: "Fornecedora Alfa".to_string(),
            merchant_city: "Sao Paulo".to_string(),
            amount_cents: 10_000,
            transaction_id: "FRA00000000AAAAAAAA".to_string(),
        });
        assert_well_formed(&payload);

        let (body, crc) = payload.split_at(payload.len() - 4);
        assert_eq!(crc, format!("{:04X}", crc16_ccitt(body.as_bytes())));
    }

    #[test]
    fn test_description_dropped_when_key_fills_the_template() {
        // A maximum-length 77-char key fills the template exactly, leaving no
        // room for a description field at all.
        let payload = build_payload(&EmvPayload {
            pix_key: "k".repeat(77),
            description: "Pedido ORD-1".to_string(),
            merchant_name: "Fornecedora Alfa".to_string(),
            merchant_city: "Sao Paulo".to_string(),
            amount_cents: 10_000,
            transaction_id: "FRA00000000AAAAAAAA".to_string(),
        });
        assert_well_formed(&payload);
        assert!(!payload.contains("Pedido"));
    }
}
