/// Raw row of the `storage` table: one serialized snapshot per key.
pub struct SnapshotRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
