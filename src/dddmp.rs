//! Text-mode structural dumps in the [DDDMP] format used by CUDD.
//!
//! Only ASCII mode with a single root is produced. Nodes are numbered
//! bottom-up starting with the terminal (`1`); every node line reads
//! `<id> <position> <then-id> <else-id>`, where `<position>` is the index of
//! the node's variable among the support variables sorted by level. The
//! then edge is always regular, the else edge and the root may carry a minus
//! sign for a complemented edge.
//!
//! Variables are identified by name (`.suppvarnames`), so a dump can be
//! loaded into an engine with a different variable history.
//!
//! [DDDMP]: https://github.com/ssoelvsten/cudd/tree/main/dddmp

// spell-checker:ignore varinfo,suppvar,varnames,suppvarnames,orderedvarnames
// spell-checker:ignore permids,auxids,rootids,rootnames
// spell-checker:ignore nnodes,nvars,nsuppvars,nroots

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};

use log::debug;

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::{NodeId, Var};

const VERSION: &str = "DDDMP-2.0";

/// `.varinfo` value meaning "no extra info on node lines".
const VARINFO_NONE: u32 = 4;

/// One decision node of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpNode {
    /// Index among the support variables sorted by level.
    pub position: u32,
    pub then_id: isize,
    pub else_id: isize,
}

/// The content of a structural dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    /// Number of variables of the dumping engine.
    pub nvars: usize,
    /// Support variable indices, ascending.
    pub ids: Vec<u32>,
    /// Levels of the support variables, parallel to `ids`.
    pub permids: Vec<u32>,
    /// Names of the support variables, parallel to `ids`.
    pub supp_var_names: Vec<String>,
    /// Names of all variables, top to bottom. Empty if not present.
    pub ordered_var_names: Vec<String>,
    /// Root id, negative if complemented.
    pub root: isize,
    /// Decision nodes; `nodes[k]` has id `k + 2`.
    pub nodes: Vec<DumpNode>,
}

impl DumpFile {
    /// Total number of nodes, terminal included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len() + 1
    }

    /// Support variable names ordered by level, i.e. indexed by position.
    pub fn names_by_position(&self) -> Vec<&str> {
        let mut pairs: Vec<(u32, &str)> = self
            .permids
            .iter()
            .copied()
            .zip(self.supp_var_names.iter().map(String::as_str))
            .collect();
        pairs.sort_unstable();
        pairs.into_iter().map(|(_, name)| name).collect()
    }

    pub fn write(&self, mut file: impl Write) -> io::Result<()> {
        writeln!(file, ".ver {}", VERSION)?;
        writeln!(file, ".mode A")?;
        writeln!(file, ".varinfo {}", VARINFO_NONE)?;
        writeln!(file, ".nnodes {}", self.num_nodes())?;
        writeln!(file, ".nvars {}", self.nvars)?;
        writeln!(file, ".nsuppvars {}", self.ids.len())?;
        writeln!(file, ".suppvarnames{}", join(&self.supp_var_names))?;
        if !self.ordered_var_names.is_empty() {
            writeln!(file, ".orderedvarnames{}", join(&self.ordered_var_names))?;
        }
        writeln!(file, ".ids{}", join(&self.ids))?;
        writeln!(file, ".permids{}", join(&self.permids))?;
        writeln!(file, ".nroots 1")?;
        writeln!(file, ".rootids {}", self.root)?;
        writeln!(file, ".nodes")?;
        writeln!(file, "1 T 0 0")?;
        for (k, node) in self.nodes.iter().enumerate() {
            writeln!(file, "{} {} {} {}", k + 2, node.position, node.then_id, node.else_id)?;
        }
        writeln!(file, ".end")?;
        Ok(())
    }

    /// Parses and validates a dump.
    ///
    /// Every structural property the loader relies on is checked here, so a
    /// successfully parsed file can be loaded without further checks.
    pub fn parse(input: impl BufRead) -> Result<DumpFile, String> {
        let mut lines = input.lines().enumerate().map(|(i, line)| (i + 1, line));

        let mut version = None;
        let mut ascii = None;
        let mut varinfo = VARINFO_NONE;
        let mut nnodes = None;
        let mut nvars = None;
        let mut nsuppvars = None;
        let mut nroots = None;
        let mut ids = None;
        let mut permids = None;
        let mut supp_var_names = None;
        let mut ordered_var_names = Vec::new();
        let mut rootids = None;

        loop {
            let Some((line_no, line)) = lines.next() else {
                return Err("unexpected end of file in header".to_string());
            };
            let line = line.map_err(|e| e.to_string())?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once([' ', '\t']) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            match key {
                ".ver" => match value {
                    "DDDMP-2.0" | "DDDMP-3.0" => version = Some(value.to_string()),
                    _ => return Err(format!("unsupported version '{}' (line {})", value, line_no)),
                },
                ".mode" => match value {
                    "A" => ascii = Some(true),
                    "B" => ascii = Some(false),
                    _ => return Err(format!("unknown value '{}' for key '.mode' (line {})", value, line_no)),
                },
                ".varinfo" => {
                    varinfo = parse_num(value, line_no)?;
                    if varinfo > VARINFO_NONE {
                        return Err(format!("unknown value '{}' for key '.varinfo' (line {})", value, line_no));
                    }
                }
                ".dd" | ".varnames" | ".auxids" | ".rootnames" => {}
                ".nnodes" => nnodes = Some(parse_num::<usize>(value, line_no)?),
                ".nvars" => nvars = Some(parse_num::<usize>(value, line_no)?),
                ".nsuppvars" => nsuppvars = Some(parse_num::<usize>(value, line_no)?),
                ".nroots" => nroots = Some(parse_num::<usize>(value, line_no)?),
                ".ids" => ids = Some(parse_list::<u32>(value, line_no)?),
                ".permids" => permids = Some(parse_list::<u32>(value, line_no)?),
                ".suppvarnames" => supp_var_names = Some(value.split_whitespace().map(String::from).collect::<Vec<_>>()),
                ".orderedvarnames" => ordered_var_names = value.split_whitespace().map(String::from).collect(),
                ".rootids" => rootids = Some(parse_list::<isize>(value, line_no)?),
                ".nodes" => break,
                _ => return Err(format!("unknown key '{}' (line {})", key, line_no)),
            }
        }

        if version.is_none() {
            return Err("missing '.ver'".to_string());
        }
        match ascii {
            Some(true) => {}
            Some(false) => return Err("binary mode is not supported".to_string()),
            None => return Err("missing '.mode'".to_string()),
        }
        let nnodes = nnodes.ok_or("missing '.nnodes'")?;
        let nvars = nvars.ok_or("missing '.nvars'")?;
        let nsuppvars = nsuppvars.ok_or("missing '.nsuppvars'")?;
        let ids = ids.ok_or("missing '.ids'")?;
        let permids = permids.ok_or("missing '.permids'")?;
        let supp_var_names = supp_var_names.ok_or("missing '.suppvarnames'")?;
        let rootids = rootids.ok_or("missing '.rootids'")?;

        if nroots != Some(1) || rootids.len() != 1 {
            return Err(format!("expected exactly one root, got {}", rootids.len()));
        }
        if nnodes == 0 {
            return Err("'.nnodes' must be positive".to_string());
        }
        if nsuppvars > nvars {
            return Err(format!("{} support variables but only {} variables", nsuppvars, nvars));
        }
        for (what, len) in [(".ids", ids.len()), (".permids", permids.len()), (".suppvarnames", supp_var_names.len())] {
            if len != nsuppvars {
                return Err(format!("'{}' has {} entries, expected {}", what, len, nsuppvars));
            }
        }
        if !ordered_var_names.is_empty() && ordered_var_names.len() != nvars {
            return Err(format!("'.orderedvarnames' has {} entries, expected {}", ordered_var_names.len(), nvars));
        }
        if ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err("'.ids' must be strictly ascending".to_string());
        }
        if ids.iter().chain(&permids).any(|&i| i as usize >= nvars) {
            return Err("variable index or level out of range".to_string());
        }
        if permids.iter().collect::<HashSet<_>>().len() != permids.len() {
            return Err("'.permids' contains duplicates".to_string());
        }
        if supp_var_names.iter().collect::<HashSet<_>>().len() != supp_var_names.len() {
            return Err("'.suppvarnames' contains duplicates".to_string());
        }

        let root = rootids[0];
        if root == 0 || root.unsigned_abs() > nnodes {
            return Err(format!("root id {} out of range", root));
        }

        // Position of each node's variable, terminal at u32::MAX
        let mut positions = Vec::new();
        let mut nodes = Vec::new();
        for node_id in 1..=nnodes {
            let Some((line_no, line)) = lines.next() else {
                return Err(format!("unexpected end of file, expected node {}", node_id));
            };
            let line = line.map_err(|e| e.to_string())?;
            let mut fields = line.split_whitespace();

            let id: usize = parse_num(fields.next().unwrap_or(""), line_no)?;
            if id != node_id {
                return Err(format!("expected node ID {} on line {}", node_id, line_no));
            }
            if varinfo != VARINFO_NONE && fields.next().is_none() {
                return Err(format!("expected variable extra info (line {})", line_no));
            }
            let var = fields.next().unwrap_or("");
            let then_id: isize = parse_num(fields.next().unwrap_or(""), line_no)?;
            let else_id: isize = parse_num(fields.next().unwrap_or(""), line_no)?;
            if fields.next().is_some() {
                return Err(format!("trailing fields on node line {}", line_no));
            }

            if then_id == 0 || else_id == 0 {
                if node_id != 1 || then_id != 0 || else_id != 0 {
                    return Err(format!("the terminal must be node 1 (line {})", line_no));
                }
                positions.push(u32::MAX);
                continue;
            }
            if node_id == 1 {
                return Err(format!("node 1 must be the terminal (line {})", line_no));
            }

            let position: u32 = parse_num(var, line_no)?;
            if position as usize >= nsuppvars {
                return Err(format!("variable position {} out of range (line {})", position, line_no));
            }
            for child in [then_id, else_id] {
                let child = child.unsigned_abs();
                if child >= node_id {
                    return Err(format!("children ids must be less than node ({} >= {}, line {})", child, node_id, line_no));
                }
                if positions[child - 1] <= position {
                    return Err(format!("node {} is not above its children (line {})", node_id, line_no));
                }
            }
            positions.push(position);
            nodes.push(DumpNode { position, then_id, else_id });
        }

        match lines.next() {
            Some((_, Ok(line))) if line.trim() == ".end" => {}
            _ => return Err("missing '.end'".to_string()),
        }

        Ok(DumpFile {
            nvars,
            ids,
            permids,
            supp_var_names,
            ordered_var_names,
            root,
            nodes,
        })
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(|i| format!(" {}", i.to_string())).collect()
}

fn parse_num<T: std::str::FromStr>(s: &str, line_no: usize) -> Result<T, String> {
    s.parse().map_err(|_| format!("expected a number, got '{}' (line {})", s, line_no))
}

fn parse_list<T: std::str::FromStr>(s: &str, line_no: usize) -> Result<Vec<T>, String> {
    s.split_whitespace().map(|x| parse_num(x, line_no)).collect()
}

fn check_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("variable name '{}' must be non-empty without spaces or control characters", name),
        ));
    }
    Ok(())
}

impl Bdd {
    /// Builds the dump of `f`.
    ///
    /// `names` is indexed by variable index; variables without a name are
    /// written as `_x{index}`.
    pub fn to_dump(&self, f: Ref, names: &[Option<String>]) -> io::Result<DumpFile> {
        let name_of = |v: Var| -> io::Result<String> {
            match names.get(v.index()).and_then(|n| n.as_deref()) {
                Some(name) => {
                    check_name(name)?;
                    Ok(name.to_string())
                }
                None => Ok(format!("_x{}", v.id())),
            }
        };

        let support = self.support_vars(f);
        let position: HashMap<Var, u32> = support.iter().enumerate().map(|(p, &v)| (v, p as u32)).collect();

        // Bottom-up: deepest level first, ids ascending within a level
        let mut ids: Vec<NodeId> = self.descendants([f]).into_iter().collect();
        ids.sort_by_key(|&id| (std::cmp::Reverse(self.level(self.variable(id))), id));
        let mut number: HashMap<NodeId, isize> = HashMap::with_capacity(ids.len() + 1);
        number.insert(NodeId::TERMINAL, 1);
        for (k, &id) in ids.iter().enumerate() {
            number.insert(id, k as isize + 2);
        }
        let signed = |r: Ref| -> isize {
            let n = number[&r.id()];
            if r.is_negated() {
                -n
            } else {
                n
            }
        };

        let nodes = ids
            .iter()
            .map(|&id| {
                let node = self.node(id);
                DumpNode {
                    position: position[&node.variable],
                    then_id: signed(node.high),
                    else_id: signed(node.low),
                }
            })
            .collect();

        let mut by_index = support.clone();
        by_index.sort();
        let supp_var_names = by_index.iter().map(|&v| name_of(v)).collect::<io::Result<Vec<_>>>()?;
        let ordered_var_names = self.var_order().into_iter().map(name_of).collect::<io::Result<Vec<_>>>()?;

        Ok(DumpFile {
            nvars: self.num_vars(),
            ids: by_index.iter().map(|v| v.id()).collect(),
            permids: by_index.iter().map(|&v| self.level(v).raw()).collect(),
            supp_var_names,
            ordered_var_names,
            root: signed(f),
            nodes,
        })
    }

    /// Writes `f` in DDDMP form, see [`to_dump`](Self::to_dump).
    pub fn store(&self, f: Ref, names: &[Option<String>], file: impl Write) -> io::Result<()> {
        let dump = self.to_dump(f, names)?;
        debug!("Storing {} nodes over {} support variables", dump.num_nodes(), dump.ids.len());
        dump.write(file)
    }

    /// Rebuilds a parsed dump, resolving support variables by name.
    ///
    /// All names are resolved before any node is created. The result does
    /// not depend on the current variable order.
    pub fn load_by_names(&self, dump: &DumpFile, resolve: impl Fn(&str) -> Option<Var>) -> Result<Ref, String> {
        let vars = dump
            .names_by_position()
            .into_iter()
            .map(|name| resolve(name).ok_or_else(|| format!("variable '{}' is not known", name)))
            .collect::<Result<Vec<Var>, String>>()?;

        let mut built: Vec<Ref> = Vec::with_capacity(dump.num_nodes());
        built.push(self.one());
        let edge = |built: &[Ref], id: isize| built[id.unsigned_abs() - 1].negate_if(id < 0);

        for node in &dump.nodes {
            let v = self.mk_var(vars[node.position as usize]);
            let t = edge(&built, node.then_id);
            let e = edge(&built, node.else_id);
            built.push(self.apply_ite(v, t, e));
        }

        let res = edge(&built, dump.root);
        debug!("Loaded {} nodes, result has {} nodes", dump.num_nodes(), self.dag_size(res));
        Ok(res)
    }
}
