//! Size synthesis for symbols that do not record one.

use crate::core::section::Section;
use crate::core::symbol::Symbol;

/// Assigns sizes to zero-sized addressable symbols.
///
/// Symbols are grouped by `(section, address)`. A group with any zero-sized
/// member gets the distance to the next distinct address in the same
/// section, or to the end of the section when it is the last group there.
/// Symbols that already have a size keep it, so running this twice changes
/// nothing.
pub fn synthesize_sizes(symbols: &mut [Symbol], sections: &[Section]) {
    let mut order: Vec<usize> = (0..symbols.len())
        .filter(|&i| symbols[i].has_addr)
        .collect();
    order.sort_by_key(|&i| (symbols[i].section, symbols[i].address));

    let mut rest = &order[..];
    while let Some(&first) = rest.first() {
        let key = (symbols[first].section, symbols[first].address);
        let group = rest
            .iter()
            .take_while(|&&i| (symbols[i].section, symbols[i].address) == key)
            .count();
        let (members, tail) = rest.split_at(group);
        rest = tail;

        if members.iter().all(|&i| symbols[i].size != 0) {
            continue;
        }

        let (section, address) = key;
        let size = match tail.first() {
            Some(&next) if symbols[next].section == section => symbols[next].address - address,
            _ => section
                .and_then(|s| sections.get(s))
                .map_or(0, |s| s.end().saturating_sub(address)),
        };

        for &i in members {
            if symbols[i].size == 0 {
                symbols[i].size = size;
            }
        }
    }
}
