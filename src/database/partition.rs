use crate::contents::FileContentsPiece;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Distribute `pieces` over `count` partitions so that every partition
/// holds about the same number of bytes.
///
/// Heaviest pieces are placed first, each into the currently lightest
/// partition. Inside a partition pieces keep file order.
pub fn partition_pieces(
    mut pieces: Vec<FileContentsPiece>,
    count: usize,
) -> Vec<Vec<FileContentsPiece>> {
    let count = count.max(1);
    let mut partitions: Vec<Vec<FileContentsPiece>> = (0..count).map(|_| Vec::new()).collect();
    pieces.sort_by_key(|p| Reverse(p.weight()));

    let mut loads: BinaryHeap<Reverse<(usize, usize)>> =
        (0..count).map(|index| Reverse((0, index))).collect();
    for piece in pieces {
        let Some(Reverse((load, index))) = loads.pop() else {
            break;
        };
        // Empty pieces still cost a visit.
        let weight = piece.weight().max(1);
        partitions[index].push(piece);
        loads.push(Reverse((load + weight, index)));
    }

    for partition in &mut partitions {
        partition.sort_by_key(|p| (p.file_id, p.range.start));
    }
    partitions.retain(|p| !p.is_empty());
    partitions
}
