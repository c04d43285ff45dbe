use crate::model::{NeighborKey, NeighborRecord};
use std::collections::HashMap;

/// Reconcile one device's CDP and LLDP neighbors into one record per
/// `(local device, remote device, local int, remote int)` key.
///
/// CDP wins on collisions, but keeps the LLDP port description when CDP has
/// none. Output keeps LLDP order, followed by CDP-only records in CDP order.
pub fn merge_neighbors(cdp: Vec<NeighborRecord>, lldp: Vec<NeighborRecord>) -> Vec<NeighborRecord> {
    let mut merged: Vec<NeighborRecord> = Vec::with_capacity(cdp.len() + lldp.len());
    let mut index: HashMap<NeighborKey, usize> = HashMap::new();

    for record in lldp {
        match index.get(&record.key()).copied() {
            Some(slot) => merged[slot] = record,
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record);
            }
        }
    }

    for mut record in cdp {
        match index.get(&record.key()).copied() {
            Some(slot) => {
                let existing = &merged[slot];
                if record.description.is_empty() && !existing.description.is_empty() {
                    record.description = existing.description.clone();
                }
                merged[slot] = record;
            }
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceOs;
    use std::collections::HashSet;

    fn record(remote: &str, local_int: &str, remote_int: &str) -> NeighborRecord {
        let mut r = NeighborRecord::new("sw1", remote);
        r.local_int = local_int.to_string();
        r.remote_int = remote_int.to_string();
        r
    }

    #[test]
    fn test_cdp_with_empty_lldp_is_unchanged() {
        let mut a = record("sw2", "Gi1/0/1", "Gi1/0/2");
        a.description = "module".to_string();
        let b = record("sw3", "Gi1/0/3", "Gi1/0/4");
        let cdp = vec![a.clone(), b.clone()];

        let merged = merge_neighbors(cdp, Vec::new());

        assert_eq!(merged, vec![a, b]);
    }

    #[test]
    fn test_cdp_wins_but_keeps_lldp_description() {
        let mut lldp = record("sw2", "Gi1/0/1", "Gi1/0/2");
        lldp.description = "uplink".to_string();
        lldp.platform = "lldp-platform".to_string();
        lldp.ipv4 = "192.0.2.1".to_string();

        let mut cdp = record("sw2", "Gi1/0/1", "Gi1/0/2");
        cdp.platform = "WS-C3850".to_string();
        cdp.ipv4 = "10.0.0.2".to_string();
        cdp.os = DeviceOs::CiscoIos;

        let merged = merge_neighbors(vec![cdp], vec![lldp]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "uplink");
        assert_eq!(merged[0].platform, "WS-C3850");
        assert_eq!(merged[0].ipv4, "10.0.0.2");
        assert_eq!(merged[0].os, DeviceOs::CiscoIos);
    }

    #[test]
    fn test_cdp_description_is_not_overwritten() {
        let mut lldp = record("sw2", "Gi1/0/1", "Gi1/0/2");
        lldp.description = "uplink".to_string();
        let mut cdp = record("sw2", "Gi1/0/1", "Gi1/0/2");
        cdp.description = "cdp says".to_string();

        let merged = merge_neighbors(vec![cdp], vec![lldp]);

        assert_eq!(merged[0].description, "cdp says");
    }

    #[test]
    fn test_every_key_appears_exactly_once() {
        let lldp = vec![
            record("sw2", "Gi1/0/1", "Gi1/0/2"),
            record("ap1", "Gi1/0/9", "a0b1.c2d3.e4f5"),
        ];
        let cdp = vec![
            record("sw2", "Gi1/0/1", "Gi1/0/2"),
            record("sw3", "Gi1/0/3", "Gi1/0/4"),
            record("sw3", "Gi1/0/3", "Gi1/0/4"),
        ];

        let merged = merge_neighbors(cdp, lldp);
        let keys: HashSet<NeighborKey> = merged.iter().map(NeighborRecord::key).collect();

        assert_eq!(merged.len(), 3);
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&record("ap1", "Gi1/0/9", "a0b1.c2d3.e4f5").key()));
        assert!(keys.contains(&record("sw3", "Gi1/0/3", "Gi1/0/4").key()));
    }
}
