//! # 声子数据集组装
//!
//! 组装流程：
//! 1. 读取结构文件（默认 pw.x 输入）
//! 2. 读取 scf.out 得到 alat，并校验原子数与晶胞
//! 3. 解析 matdyn.modes，q 点换算为约化坐标
//! 4. 能带连接（可关闭）
//! 5. 计算路径距离
//! 6. 高对称点检测（路径查找模式可能压缩距离）
//! 7. 生成不可变的 PhononDataset
//!
//! 任何一步失败都会中止，不产生部分结果。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 和 `commands/batch.rs` 调用
//! - 使用 `parsers/`, `phonon/band_connection.rs`, `phonon/highsym.rs`

use super::band_connection::connect_bands;
use super::highsym::{self, LabelMerge, LabelStrategy};
use crate::error::{PhononError, Result};
use crate::models::{Crystal, PhononDataset};
use crate::parsers::matdyn::{self, MatdynModes};
use crate::parsers::pw_output::{self, ScfOutput};
use crate::parsers::{self, DEFAULT_STRUCTURE_FORMAT};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认的超胞重复次数
pub const DEFAULT_REPETITIONS: [usize; 3] = [3, 3, 3];

/// 输入文件名（相对于数据目录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFiles {
    pub scf_in: String,
    pub scf_out: String,
    pub modes: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        InputFiles {
            scf_in: "scf.in".to_string(),
            scf_out: "scf.out".to_string(),
            modes: "matdyn.modes".to_string(),
        }
    }
}

impl InputFiles {
    pub fn names(&self) -> [&str; 3] {
        [&self.scf_in, &self.scf_out, &self.modes]
    }

    /// 目录下是否三个文件都存在
    pub fn present_in(&self, folder: &Path) -> bool {
        self.names().iter().all(|name| folder.join(name).is_file())
    }
}

/// 一次转换的结果
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub dataset: PhononDataset,
    /// 路径查找模式下发生的标签合并
    pub merges: Vec<LabelMerge>,
    /// 使用的高对称点策略
    pub strategy: &'static str,
    /// 是否做了能带连接
    pub reordered: bool,
}

/// 数据集组装器
#[derive(Debug, Clone)]
pub struct PhononBuilder {
    folder: PathBuf,
    files: InputFiles,
    structure_format: String,
    name: Option<String>,
    repetitions: [usize; 3],
    reorder: bool,
}

impl PhononBuilder {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        PhononBuilder {
            folder: folder.into(),
            files: InputFiles::default(),
            structure_format: DEFAULT_STRUCTURE_FORMAT.to_string(),
            name: None,
            repetitions: DEFAULT_REPETITIONS,
            reorder: true,
        }
    }

    pub fn files(mut self, files: InputFiles) -> Self {
        self.files = files;
        self
    }

    pub fn structure_format(mut self, format: impl Into<String>) -> Self {
        self.structure_format = format.into();
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn repetitions(mut self, repetitions: [usize; 3]) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn reorder(mut self, reorder: bool) -> Self {
        self.reorder = reorder;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// 数据集名称：显式给出或取目录名
    pub fn dataset_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        fs::canonicalize(&self.folder)
            .ok()
            .as_deref()
            .unwrap_or(self.folder.as_path())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("PW")
            .to_string()
    }

    /// 检查目录与三个输入文件
    pub fn check_inputs(&self) -> Result<()> {
        if !self.folder.is_dir() {
            return Err(PhononError::DirectoryNotFound {
                path: self.folder.display().to_string(),
            });
        }
        for name in self.files.names() {
            let path = self.folder.join(name);
            if !path.is_file() {
                return Err(PhononError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// 读取全部输入并组装数据集
    pub fn build(&self, strategy: &LabelStrategy) -> Result<ConversionReport> {
        self.check_inputs()?;

        let crystal = parsers::read_structure(
            &self.folder.join(&self.files.scf_in),
            &self.structure_format,
        )?;
        let scf = pw_output::parse_pw_output_file(&self.folder.join(&self.files.scf_out))?;
        scf.validate_against(&crystal)?;
        let modes =
            matdyn::parse_matdyn_file(&self.folder.join(&self.files.modes), crystal.natoms())?;

        assemble(
            self.dataset_name(),
            crystal,
            &scf,
            modes,
            strategy,
            self.repetitions,
            self.reorder,
        )
    }
}

/// 从已解析的输入组装数据集
pub fn assemble(
    name: String,
    crystal: Crystal,
    scf: &ScfOutput,
    modes: MatdynModes,
    strategy: &LabelStrategy,
    repetitions: [usize; 3],
    reorder: bool,
) -> Result<ConversionReport> {
    let qpoints = modes.reduced_qpoints(&crystal.lattice, scf.alat)?;
    let mode_set = if reorder {
        connect_bands(&modes.modes)
    } else {
        modes.modes
    };

    let distances = crystal.lattice.path_distances(&qpoints)?;
    let highsym = highsym::detect(strategy, &crystal, &qpoints, &distances)?;

    let dataset = PhononDataset::new(
        name,
        crystal,
        qpoints,
        mode_set,
        highsym.distances,
        highsym.points,
        repetitions,
        scf.alat,
        highsym.seekpath_data,
    );

    Ok(ConversionReport {
        dataset,
        merges: highsym.merges,
        strategy: strategy.name(),
        reordered: reorder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dataset::HighSymmetryPoint;
    use crate::models::ModeSet;
    use crate::parsers::BOHR_IN_ANGSTROM;
    use crate::phonon::symmetry_path::BuiltinPathTable;
    use num_complex::Complex64;

    const SCF_IN: &str = r#"
&control
  calculation = 'scf'
/
&system
  ibrav = 1, celldm(1) = 8.0, nat = 2, ntyp = 2
/
&electrons
/
ATOMIC_SPECIES
 Na 22.99 Na.pbe-spn-kjpaw_psl.1.0.0.UPF
 Cl 35.45 Cl.pbe-n-kjpaw_psl.1.0.0.UPF
ATOMIC_POSITIONS crystal
 Na 0.0 0.0 0.0
 Cl 0.5 0.5 0.5
K_POINTS automatic
 4 4 4 0 0 0
"#;

    const SCF_OUT: &str = r#"
     bravais-lattice index     =            1
     lattice parameter (alat)  =       8.0000  a.u.
     number of atoms/cell      =            2
     number of atomic types    =            2

     crystal axes: (cart. coord. in units of alat)
               a(1) = (   1.000000   0.000000   0.000000 )
               a(2) = (   0.000000   1.000000   0.000000 )
               a(3) = (   0.000000   0.000000   1.000000 )
"#;

    fn unit_modes() -> ModeSet {
        let basis: Vec<_> = (0..6)
            .map(|n| {
                let mut v = vec![[Complex64::new(0.0, 0.0); 3]; 2];
                v[n / 3][n % 3] = Complex64::new(1.0, 0.0);
                v
            })
            .collect();
        ModeSet::new(
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; 2],
            vec![basis.clone(), basis],
        )
    }

    fn write_folder(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("phononweb-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("scf.in"), SCF_IN).unwrap();
        fs::write(dir.join("scf.out"), SCF_OUT).unwrap();
        let modes = matdyn::render_modes(&[[0.0; 3], [0.0, 0.5, 0.0]], &unit_modes());
        fs::write(dir.join("matdyn.modes"), modes).unwrap();
        dir
    }

    #[test]
    fn test_end_to_end_geometric() {
        let dir = write_folder("geometric");
        let report = PhononBuilder::new(&dir)
            .name(Some("NaCl".to_string()))
            .build(&LabelStrategy::Geometric { labels: None })
            .unwrap();
        let ds = &report.dataset;

        assert_eq!(ds.name(), "NaCl");
        assert_eq!(ds.formula(), "ClNa");
        assert_eq!(ds.nqpoints(), 2);
        for k in 0..2 {
            assert_eq!(ds.eigenvalues()[k], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }

        // 约化坐标 (0, 0.5, 0)，晶体学倒易基下长度 0.5 / a
        let a = 8.0 * BOHR_IN_ANGSTROM;
        assert!((ds.qpoints()[1][1] - 0.5).abs() < 1e-9);
        assert_eq!(ds.distances()[0], 0.0);
        assert!((ds.distances()[1] - 0.5 / a).abs() < 1e-9);
        assert!((ds.alat() - a).abs() < 1e-12);

        assert_eq!(
            ds.highsym_qpts(),
            &[HighSymmetryPoint::unlabeled(0), HighSymmetryPoint::unlabeled(1)]
        );
        assert!(ds.seekpath_data().is_none());
        assert_eq!(ds.repetitions(), DEFAULT_REPETITIONS);
        assert!(report.merges.is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_end_to_end_path_lookup() {
        let dir = write_folder("pathlookup");
        let report = PhononBuilder::new(&dir)
            .build(&LabelStrategy::PathLookup(Box::new(BuiltinPathTable)))
            .unwrap();
        let ds = &report.dataset;

        // G 与 X 相邻，合并为 "G|X"，X 之后的距离减去两点间距
        assert_eq!(ds.highsym_qpts(), &[HighSymmetryPoint::new(0, "G|X")]);
        assert_eq!(report.merges.len(), 1);
        let a = 8.0 * BOHR_IN_ANGSTROM;
        assert!((report.merges[0].gap - 0.5 / a).abs() < 1e-9);
        assert_eq!(ds.distances()[0], 0.0);
        assert!(ds.distances()[1].abs() < 1e-12);
        assert!(ds.seekpath_data().is_some());
        assert_eq!(report.strategy, "path-lookup");
        // 名称取目录名
        assert!(ds.name().starts_with("phononweb-pathlookup"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_input_file() {
        let dir = write_folder("missing");
        fs::remove_file(dir.join("scf.out")).unwrap();
        let err = PhononBuilder::new(&dir)
            .build(&LabelStrategy::Geometric { labels: None })
            .unwrap_err();
        assert!(matches!(err, PhononError::FileNotFound { ref path } if path.ends_with("scf.out")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_folder() {
        let err = PhononBuilder::new("/nonexistent/phonon/folder")
            .build(&LabelStrategy::Geometric { labels: None })
            .unwrap_err();
        assert!(matches!(err, PhononError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_assemble_without_reorder_keeps_input() {
        let crystal = parsers::pw_input::parse_pw_input_content(SCF_IN, "NaCl").unwrap();
        let scf = pw_output::parse_pw_output_content(SCF_OUT, "scf.out").unwrap();
        let mut modes = unit_modes();
        modes.eigenvectors[1].swap(0, 1);
        modes.eigenvalues[1].swap(0, 1);
        let parsed = MatdynModes {
            qpoints: vec![[0.0; 3], [0.0, 0.5, 0.0]],
            modes: modes.clone(),
        };

        let report = assemble(
            "NaCl".to_string(),
            crystal.clone(),
            &scf,
            parsed.clone(),
            &LabelStrategy::Geometric { labels: None },
            [2, 2, 2],
            false,
        )
        .unwrap();
        assert_eq!(report.dataset.modes(), &modes);

        let reordered = assemble(
            "NaCl".to_string(),
            crystal,
            &scf,
            parsed,
            &LabelStrategy::Geometric { labels: None },
            [2, 2, 2],
            true,
        )
        .unwrap();
        assert_eq!(reordered.dataset.eigenvalues()[1], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_atom_count_mismatch_between_files() {
        let dir = write_folder("mismatch");
        let content = SCF_OUT.replace("number of atoms/cell      =            2", "number of atoms/cell      =            3");
        fs::write(dir.join("scf.out"), content).unwrap();
        let err = PhononBuilder::new(&dir)
            .build(&LabelStrategy::Geometric { labels: None })
            .unwrap_err();
        assert!(matches!(err, PhononError::StructuralMismatch { .. }));
        fs::remove_dir_all(&dir).ok();
    }
}
