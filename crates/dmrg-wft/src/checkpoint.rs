//! HDF5 persistence of the transformation factory.
//!
//! Schema:
//! ```text
//! /Wft
//!   @type = "WaveFunctionTransformation"
//!   @version = 1
//!   @isEnabled = u8
//!   WftOptions/            @phase, @two_site, @first_call, @counter,
//!                          @dense_sparse_threshold
//!   WaveStructPrevious/    system/ environ/ (snapshots), lrs/{left,right,super}
//!   wsStack/               @len, s0/ .. sN/ (snapshots, bottom to top)
//!   weStack/               @len, s0/ .. sN/
//! ```
//!
//! Matrix data is stored flat in column-major order, tagged
//! `Dense{Float64}` or `Dense{ComplexF64}` so that a file written for one
//! scalar type is rejected when read back as the other.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use hdf5::types::VarLenUnicode;
use hdf5::Group;
use mdarray::DTensor;
use num_complex::Complex64;

use dmrg_core::{BlockDiagonalMatrix, LeftRightSuper, Qn, Scalar, SectorBasis};

use crate::combined::CombinedWave;
use crate::options::{GrowthSide, SweepPhase, WftOptions};
use crate::snapshot::TransformSnapshot;
use crate::stack::TransformStack;

const ROOT_TAG: &str = "WaveFunctionTransformation";
const VERSION: i64 = 1;

/// Factory state as deserialized from a checkpoint file.
pub struct FactoryState<T: Scalar> {
    pub enabled: bool,
    pub options: WftOptions,
    pub combined: CombinedWave<T>,
    pub system_stack: TransformStack<T>,
    pub environ_stack: TransformStack<T>,
}

pub fn write_factory<T: Scalar>(
    path: &Path,
    enabled: bool,
    options: &WftOptions,
    combined: &CombinedWave<T>,
    system_stack: &TransformStack<T>,
    environ_stack: &TransformStack<T>,
) -> Result<()> {
    let file = hdf5::File::create(path)
        .with_context(|| format!("Failed to create checkpoint file {}", path.display()))?;
    let root = file.create_group("Wft")?;

    write_string_attr(&root, "type", ROOT_TAG)?;
    let version_attr = root.new_attr::<i64>().shape(()).create("version")?;
    version_attr.as_writer().write_scalar(&VERSION)?;
    write_u8_attr(&root, "isEnabled", enabled as u8)?;

    write_options(&root.create_group("WftOptions")?, options)?;
    write_combined(&root.create_group("WaveStructPrevious")?, combined)?;
    write_stack(&root.create_group("wsStack")?, system_stack)?;
    write_stack(&root.create_group("weStack")?, environ_stack)?;
    Ok(())
}

pub fn read_factory<T: Scalar>(path: &Path) -> Result<FactoryState<T>> {
    let file = hdf5::File::open(path)
        .with_context(|| format!("Failed to open checkpoint file {}", path.display()))?;
    let root = file.group("Wft").context("Group 'Wft' not found")?;

    let tag = read_string_attr(&root, "type")?;
    if !tag.contains(ROOT_TAG) {
        bail!("Unexpected checkpoint type: {}", tag);
    }
    let version = root
        .attr("version")
        .context("Attribute 'version' not found")?
        .as_reader()
        .read_scalar::<i64>()?;
    if version != VERSION {
        bail!("Unsupported checkpoint version: {}", version);
    }

    let enabled = read_u8_attr(&root, "isEnabled")? != 0;
    let options = read_options(&root.group("WftOptions")?)?;
    let combined = read_combined(&root.group("WaveStructPrevious")?)?;
    let system_stack = read_stack(&root.group("wsStack")?)?;
    let environ_stack = read_stack(&root.group("weStack")?)?;

    Ok(FactoryState {
        enabled,
        options,
        combined,
        system_stack,
        environ_stack,
    })
}

fn write_options(group: &Group, options: &WftOptions) -> Result<()> {
    write_u8_attr(group, "phase", options.phase.code())?;
    write_u8_attr(group, "two_site", options.two_site as u8)?;
    write_u8_attr(group, "first_call", options.first_call as u8)?;
    write_u64_attr(group, "counter", options.counter as u64)?;
    let attr = group
        .new_attr::<f64>()
        .shape(())
        .create("dense_sparse_threshold")?;
    attr.as_writer()
        .write_scalar(&options.dense_sparse_threshold)?;
    Ok(())
}

fn read_options(group: &Group) -> Result<WftOptions> {
    let code = read_u8_attr(group, "phase")?;
    let phase = SweepPhase::from_code(code)
        .with_context(|| format!("Unknown sweep phase code {}", code))?;
    let two_site = read_u8_attr(group, "two_site")? != 0;
    let first_call = read_u8_attr(group, "first_call")? != 0;
    let counter = read_u64_attr(group, "counter")? as usize;
    let dense_sparse_threshold = group
        .attr("dense_sparse_threshold")
        .context("Attribute 'dense_sparse_threshold' not found")?
        .as_reader()
        .read_scalar::<f64>()?;
    Ok(WftOptions {
        phase,
        two_site,
        first_call,
        counter,
        dense_sparse_threshold,
    })
}

fn write_combined<T: Scalar>(group: &Group, combined: &CombinedWave<T>) -> Result<()> {
    write_snapshot(
        &group.create_group("system")?,
        combined.wave(GrowthSide::System),
    )?;
    write_snapshot(
        &group.create_group("environ")?,
        combined.wave(GrowthSide::Environ),
    )?;
    let lrs_group = group.create_group("lrs")?;
    write_basis(&lrs_group.create_group("left")?, combined.lrs().left())?;
    write_basis(&lrs_group.create_group("right")?, combined.lrs().right())?;
    write_basis(
        &lrs_group.create_group("super")?,
        combined.lrs().super_basis(),
    )?;
    Ok(())
}

fn read_combined<T: Scalar>(group: &Group) -> Result<CombinedWave<T>> {
    let system = read_snapshot(&group.group("system")?)?;
    let environ = read_snapshot(&group.group("environ")?)?;
    let lrs_group = group.group("lrs")?;
    let left = read_basis(&lrs_group.group("left")?)?;
    let right = read_basis(&lrs_group.group("right")?)?;
    let super_basis = read_basis(&lrs_group.group("super")?)?;
    let lrs = LeftRightSuper::new(left, right, super_basis)?;
    Ok(CombinedWave::from_parts(system, environ, lrs))
}

fn write_stack<T: Scalar>(group: &Group, stack: &TransformStack<T>) -> Result<()> {
    write_u64_attr(group, "len", stack.len() as u64)?;
    for (i, snapshot) in stack.iter().enumerate() {
        write_snapshot(&group.create_group(&format!("s{}", i))?, snapshot)?;
    }
    Ok(())
}

fn read_stack<T: Scalar>(group: &Group) -> Result<TransformStack<T>> {
    let len = read_u64_attr(group, "len")? as usize;
    let mut stack = TransformStack::new();
    for i in 0..len {
        let snapshot = read_snapshot(&group.group(&format!("s{}", i))?)?;
        stack.push(snapshot);
    }
    Ok(stack)
}

fn write_snapshot<T: Scalar>(group: &Group, snapshot: &TransformSnapshot<T>) -> Result<()> {
    write_matrix_list(
        &group.create_group("transform")?,
        snapshot.transform().blocks(),
    )?;
    write_matrix_list(&group.create_group("vts")?, snapshot.vts())?;
    write_f64_lists(&group.create_group("svals")?, snapshot.svals())?;
    write_qns(&group.create_group("qns")?, snapshot.qns())?;
    Ok(())
}

fn read_snapshot<T: Scalar>(group: &Group) -> Result<TransformSnapshot<T>> {
    let blocks = read_matrix_list(&group.group("transform")?)?;
    let vts = read_matrix_list(&group.group("vts")?)?;
    let svals = read_f64_lists(&group.group("svals")?)?;
    let qns = read_qns(&group.group("qns")?)?;
    Ok(TransformSnapshot::new(
        BlockDiagonalMatrix::from_blocks(blocks),
        vts,
        svals,
        qns,
    ))
}

fn write_basis(group: &Group, basis: &SectorBasis) -> Result<()> {
    write_u64_vec(group, "permutation", basis.permutation_vec())?;
    write_u64_vec(group, "offsets", basis.offsets())?;
    write_u64_vec(group, "sites", basis.sites())?;
    let lens: Vec<usize> = basis.qns().iter().map(|qn| qn.len()).collect();
    let numbers: Vec<i64> = basis
        .qns()
        .iter()
        .flat_map(|qn| qn.numbers().iter().copied())
        .collect();
    write_u64_vec(group, "qn_lens", &lens)?;
    write_i64_vec(group, "qn_data", &numbers)?;
    Ok(())
}

fn read_basis(group: &Group) -> Result<SectorBasis> {
    let permutation = read_u64_vec(group, "permutation")?;
    let offsets = read_u64_vec(group, "offsets")?;
    let sites = read_u64_vec(group, "sites")?;
    let lens = read_u64_vec(group, "qn_lens")?;
    let numbers = read_i64_vec(group, "qn_data")?;

    let total: usize = lens.iter().sum();
    if numbers.len() != total {
        bail!(
            "Sector label data length {} does not match lengths sum {}",
            numbers.len(),
            total
        );
    }
    let mut qns = Vec::with_capacity(lens.len());
    let mut at = 0;
    for &len in &lens {
        qns.push(Qn::new(numbers[at..at + len].to_vec()));
        at += len;
    }
    Ok(SectorBasis::new(permutation, offsets, qns, sites)?)
}

/// Writes a list of dense matrices: per-matrix dimensions plus one flat
/// column-major data block.
fn write_matrix_list<T: Scalar>(group: &Group, mats: &[DTensor<T, 2>]) -> Result<()> {
    let rows: Vec<usize> = mats.iter().map(|m| m.dim(0)).collect();
    let cols: Vec<usize> = mats.iter().map(|m| m.dim(1)).collect();
    write_u64_vec(group, "rows", &rows)?;
    write_u64_vec(group, "cols", &cols)?;

    let total: usize = rows.iter().zip(&cols).map(|(r, c)| r * c).sum();
    let mut flat = Vec::with_capacity(total);
    for m in mats {
        for j in 0..m.dim(1) {
            for i in 0..m.dim(0) {
                flat.push(m[[i, j]]);
            }
        }
    }
    write_scalar_data(group, &flat)
}

fn read_matrix_list<T: Scalar>(group: &Group) -> Result<Vec<DTensor<T, 2>>> {
    let rows = read_u64_vec(group, "rows")?;
    let cols = read_u64_vec(group, "cols")?;
    if rows.len() != cols.len() {
        bail!(
            "Matrix list has {} row entries but {} column entries",
            rows.len(),
            cols.len()
        );
    }
    let flat: Vec<T> = read_scalar_data(group)?;
    let total: usize = rows.iter().zip(&cols).map(|(r, c)| r * c).sum();
    if flat.len() != total {
        bail!(
            "Matrix list data length {} does not match dimensions sum {}",
            flat.len(),
            total
        );
    }

    let mut mats = Vec::with_capacity(rows.len());
    let mut at = 0;
    for (&r, &c) in rows.iter().zip(&cols) {
        let chunk = &flat[at..at + r * c];
        mats.push(DTensor::<T, 2>::from_fn([r, c], |idx| {
            chunk[idx[1] * r + idx[0]]
        }));
        at += r * c;
    }
    Ok(mats)
}

fn write_f64_lists(group: &Group, lists: &[Vec<f64>]) -> Result<()> {
    let lens: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    let flat: Vec<f64> = lists.iter().flat_map(|l| l.iter().copied()).collect();
    write_u64_vec(group, "lens", &lens)?;
    let ds = group.new_dataset::<f64>().shape([flat.len()]).create("data")?;
    ds.as_writer().write(&flat)?;
    Ok(())
}

fn read_f64_lists(group: &Group) -> Result<Vec<Vec<f64>>> {
    let lens = read_u64_vec(group, "lens")?;
    let flat: Vec<f64> = group
        .dataset("data")?
        .as_reader()
        .read_1d()
        .context("Failed to read f64 list data")?
        .to_vec();
    split_by_lens(&lens, &flat)
}

fn write_qns(group: &Group, qns: &[Qn]) -> Result<()> {
    let lens: Vec<usize> = qns.iter().map(|qn| qn.len()).collect();
    let flat: Vec<i64> = qns
        .iter()
        .flat_map(|qn| qn.numbers().iter().copied())
        .collect();
    write_u64_vec(group, "lens", &lens)?;
    write_i64_vec(group, "data", &flat)?;
    Ok(())
}

fn read_qns(group: &Group) -> Result<Vec<Qn>> {
    let lens = read_u64_vec(group, "lens")?;
    let flat = read_i64_vec(group, "data")?;
    let lists = split_by_lens(&lens, &flat)?;
    Ok(lists.into_iter().map(Qn::new).collect())
}

fn split_by_lens<V: Copy>(lens: &[usize], flat: &[V]) -> Result<Vec<Vec<V>>> {
    let total: usize = lens.iter().sum();
    if flat.len() != total {
        bail!(
            "List data length {} does not match lengths sum {}",
            flat.len(),
            total
        );
    }
    let mut lists = Vec::with_capacity(lens.len());
    let mut at = 0;
    for &len in lens {
        lists.push(flat[at..at + len].to_vec());
        at += len;
    }
    Ok(lists)
}

/// Writes scalar data with a type tag so the reader can verify the
/// scalar type before interpreting the bytes.
fn write_scalar_data<T: Scalar>(group: &Group, values: &[T]) -> Result<()> {
    if T::is_complex_type() {
        write_string_attr(group, "type", "Dense{ComplexF64}")?;
        let data: Vec<Complex64> = values.iter().map(|v| v.to_c64()).collect();
        let ds = group
            .new_dataset::<Complex64>()
            .shape([data.len()])
            .create("data")?;
        ds.as_writer().write(&data)?;
    } else {
        write_string_attr(group, "type", "Dense{Float64}")?;
        let data: Vec<f64> = values.iter().map(|v| v.real_f64()).collect();
        let ds = group.new_dataset::<f64>().shape([data.len()]).create("data")?;
        ds.as_writer().write(&data)?;
    }
    Ok(())
}

fn read_scalar_data<T: Scalar>(group: &Group) -> Result<Vec<T>> {
    let tag = read_string_attr(group, "type")?;
    if T::is_complex_type() {
        if !tag.contains("Dense{ComplexF64}") {
            bail!("Expected complex data, found storage type {}", tag);
        }
        let data: Vec<Complex64> = group
            .dataset("data")?
            .as_reader()
            .read_1d()
            .context("Failed to read complex data")?
            .to_vec();
        Ok(data.into_iter().map(T::from_c64).collect())
    } else {
        if !tag.contains("Dense{Float64}") {
            bail!("Expected real data, found storage type {}", tag);
        }
        let data: Vec<f64> = group
            .dataset("data")?
            .as_reader()
            .read_1d()
            .context("Failed to read f64 data")?
            .to_vec();
        Ok(data.into_iter().map(T::from_f64).collect())
    }
}

fn write_string_attr(group: &Group, name: &str, value: &str) -> Result<()> {
    let attr = group.new_attr::<VarLenUnicode>().shape(()).create(name)?;
    attr.as_writer()
        .write_scalar(&VarLenUnicode::from_str(value)?)?;
    Ok(())
}

fn read_string_attr(group: &Group, name: &str) -> Result<String> {
    let attr = group
        .attr(name)
        .with_context(|| format!("Attribute '{}' not found", name))?;
    let val = attr.as_reader().read_scalar::<VarLenUnicode>()?;
    Ok(val.as_str().to_string())
}

fn write_u8_attr(group: &Group, name: &str, value: u8) -> Result<()> {
    let attr = group.new_attr::<u8>().shape(()).create(name)?;
    attr.as_writer().write_scalar(&value)?;
    Ok(())
}

fn read_u8_attr(group: &Group, name: &str) -> Result<u8> {
    let attr = group
        .attr(name)
        .with_context(|| format!("Attribute '{}' not found", name))?;
    Ok(attr.as_reader().read_scalar::<u8>()?)
}

fn write_u64_attr(group: &Group, name: &str, value: u64) -> Result<()> {
    let attr = group.new_attr::<u64>().shape(()).create(name)?;
    attr.as_writer().write_scalar(&value)?;
    Ok(())
}

fn read_u64_attr(group: &Group, name: &str) -> Result<u64> {
    let attr = group
        .attr(name)
        .with_context(|| format!("Attribute '{}' not found", name))?;
    Ok(attr.as_reader().read_scalar::<u64>()?)
}

fn write_u64_vec(group: &Group, name: &str, values: &[usize]) -> Result<()> {
    let data: Vec<u64> = values.iter().map(|&v| v as u64).collect();
    let ds = group.new_dataset::<u64>().shape([data.len()]).create(name)?;
    ds.as_writer().write(&data)?;
    Ok(())
}

fn read_u64_vec(group: &Group, name: &str) -> Result<Vec<usize>> {
    let ds = group
        .dataset(name)
        .with_context(|| format!("Dataset '{}' not found", name))?;
    let data: Vec<u64> = ds
        .as_reader()
        .read_1d()
        .with_context(|| format!("Failed to read dataset '{}'", name))?
        .to_vec();
    Ok(data.into_iter().map(|v| v as usize).collect())
}

fn write_i64_vec(group: &Group, name: &str, values: &[i64]) -> Result<()> {
    let ds = group
        .new_dataset::<i64>()
        .shape([values.len()])
        .create(name)?;
    ds.as_writer().write(values)?;
    Ok(())
}

fn read_i64_vec(group: &Group, name: &str) -> Result<Vec<i64>> {
    let ds = group
        .dataset(name)
        .with_context(|| format!("Dataset '{}' not found", name))?;
    let data: Vec<i64> = ds
        .as_reader()
        .read_1d()
        .with_context(|| format!("Failed to read dataset '{}'", name))?
        .to_vec();
    Ok(data)
}
