strong_type!(VolumeId, u32);
strong_type!(GroupId, u32);
strong_type!(NeedleKey, u64);
strong_type!(Cookie, u32);

/// Storage node identifier as published by the coordination service.
pub type StoreId = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_id() {
        let vid: VolumeId = "17".parse().unwrap();
        assert_eq!(vid, VolumeId(17));
        assert_eq!(format!("{:?}", vid), "VolumeId(17)");
    }

    #[test]
    fn test_needle_key_as_store_key() {
        let key = NeedleKey(1_234_567_890_123);
        assert_eq!(key.to_string(), "1234567890123");
        assert_eq!(key.to_string().parse::<NeedleKey>().unwrap(), key);
    }

    #[test]
    fn test_group_ordering() {
        assert!(GroupId(1) < GroupId(2));
    }
}
