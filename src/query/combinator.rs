/// Enumerate every index vector over the given per-position maxima: position
/// `i` ranges `0..=counts[i]`, in increasing lexicographic order with the
/// last position varying fastest. Produces exactly `∏(counts[i]+1)` vectors;
/// an empty input yields nothing.
pub fn combinations(counts: &[usize]) -> Vec<Vec<usize>> {
    if counts.is_empty() {
        return Vec::new();
    }
    let total: usize = counts.iter().map(|&c| c + 1).product();
    let mut out = Vec::with_capacity(total);
    let mut current = vec![0usize; counts.len()];
    loop {
        out.push(current.clone());
        // advance the odometer from the rightmost position
        let mut position = counts.len();
        loop {
            if position == 0 {
                return out;
            }
            position -= 1;
            if current[position] < counts[position] {
                current[position] += 1;
                break;
            }
            current[position] = 0;
        }
    }
}
