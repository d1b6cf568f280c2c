//! 向量与 BLOB 之间的转换，以及距离计算

/// 以本机字节序（小端）的 f32 序列存储
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(vector).to_vec()
}

/// 长度不是 4 的倍数时返回 None
pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % size_of::<f32>() != 0 {
        return None;
    }
    // 从数据库读出的 Vec<u8> 不保证 4 字节对齐，不能直接 cast
    Some(bytemuck::pod_collect_to_vec(bytes))
}

/// 平方欧氏距离，建表与查询使用同一度量
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
