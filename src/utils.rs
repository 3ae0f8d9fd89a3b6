use macaddr::MacAddr6;

/// Format a MAC address as lowercase, colon-separated hex (aa:bb:cc:dd:ee:ff)
pub fn format_mac(mac: &MacAddr6) -> String {
    mac.as_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a MAC address written with colons, hyphens or no separators.
pub fn parse_mac(text: &str) -> Option<MacAddr6> {
    let text = text.trim();
    if let Ok(mac) = text.parse::<MacAddr6>() {
        return Some(mac);
    }
    // Bare hex digits, as some tools print them
    if text.len() != 12 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut octets = [0u8; 6];
    for (index, octet) in octets.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&text[index * 2..index * 2 + 2], 16).ok()?;
    }
    Some(MacAddr6::from(octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mac() {
        let mac = MacAddr6::new(0xAA, 0xBB, 0xCC, 0x0D, 0xEE, 0x0F);
        assert_eq!(format_mac(&mac), "aa:bb:cc:0d:ee:0f");
    }

    #[test]
    fn test_parse_mac() {
        let expected = Some(MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff));
        assert_eq!(parse_mac("AA:BB:CC:DD:EE:FF"), expected);
        assert_eq!(parse_mac("aa-bb-cc-dd-ee-ff"), expected);
        assert_eq!(parse_mac("AABBCCDDEEFF"), expected);
        assert_eq!(parse_mac(" aa:bb:cc:dd:ee:ff "), expected);
    }

    #[test]
    fn test_parse_mac_rejects_garbage() {
        assert_eq!(parse_mac("aa:bb:cc:dd:ee"), None);
        assert_eq!(parse_mac("aa:bb:cc:dd:ee:gg"), None);
        assert_eq!(parse_mac("not-a-mac"), None);
        assert_eq!(parse_mac(""), None);
        assert_eq!(parse_mac("aabbccddeef"), None);
        assert_eq!(parse_mac("+abbccddeeff"), None);
    }
}
