//! # 元素周期表查询
//!
//! 原子序数与元素符号之间的只读映射，进程内首次访问时初始化一次。
//!
//! ## 依赖关系
//! - 被 `parsers/`（推断元素）和 `models/structure.rs`（化学式）使用
//! - 纯静态数据，无外部依赖

use std::collections::HashMap;
use std::sync::LazyLock;

/// 按原子序数排列的元素符号，下标 0 为占位符 "X"
pub const CHEMICAL_SYMBOLS: [&str; 119] = [
    "X", //
    "H", "He", //
    "Li", "Be", "B", "C", "N", "O", "F", "Ne", //
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", //
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se",
    "Br", "Kr", //
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te",
    "I", "Xe", //
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", //
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No",
    "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// 元素符号 -> 原子序数
pub static ATOMIC_NUMBERS: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    CHEMICAL_SYMBOLS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(z, sym)| (*sym, z as u32))
        .collect()
});

/// 查询元素符号对应的原子序数（区分大小写，如 "Si"）
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ATOMIC_NUMBERS.get(symbol).copied()
}

/// 查询原子序数对应的元素符号
pub fn chemical_symbol(number: u32) -> Option<&'static str> {
    match number {
        0 => None,
        n => CHEMICAL_SYMBOLS.get(n as usize).copied(),
    }
}

/// 将任意写法规范为首字母大写、其余小写（"SI" -> "Si"）
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_number_lookup() {
        assert_eq!(atomic_number("H"), Some(1));
        assert_eq!(atomic_number("Si"), Some(14));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(atomic_number("si"), None);
        assert_eq!(atomic_number("X"), None);
    }

    #[test]
    fn test_symbol_round_trip() {
        for z in 1..=118u32 {
            let sym = chemical_symbol(z).unwrap();
            assert_eq!(atomic_number(sym), Some(z));
        }
        assert_eq!(chemical_symbol(0), None);
        assert_eq!(chemical_symbol(119), None);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("SI"), "Si");
        assert_eq!(capitalize("o"), "O");
        assert_eq!(capitalize(""), "");
    }
}
