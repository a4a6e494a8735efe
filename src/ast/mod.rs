//! Design binding and the lightweight elaboration checks the driver reports
//! on: top-level unit selection, definition lookup, and the per-element lint
//! passes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::{DiagCode, Diagnostic};
use crate::syntax::parser::{DesignElement, ElementKind, SyntaxTree};

/// Which value of a `min:typ:max` expression is elaborated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinTypMax {
    Min,
    #[default]
    Typ,
    Max,
}

/// A time unit accepted in `timescale` specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeUnit {
    Femtoseconds,
    Picoseconds,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "s" => Some(Self::Seconds),
            "ms" => Some(Self::Milliseconds),
            "us" => Some(Self::Microseconds),
            "ns" => Some(Self::Nanoseconds),
            "ps" => Some(Self::Picoseconds),
            "fs" => Some(Self::Femtoseconds),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
            Self::Nanoseconds => "ns",
            Self::Picoseconds => "ps",
            Self::Femtoseconds => "fs",
        }
    }
}

/// One half of a time scale: a magnitude of 1, 10, or 100 plus a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScaleValue {
    pub magnitude: u16,
    pub unit: TimeUnit,
}

impl TimeScaleValue {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let split = text
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(text.len());
        let magnitude: u16 = text[..split].parse().ok()?;
        if !matches!(magnitude, 1 | 10 | 100) {
            return None;
        }
        let unit = TimeUnit::parse(&text[split..])?;
        Some(Self { magnitude, unit })
    }

    /// Femtoseconds per tick, for comparing base against precision.
    fn femtoseconds(self) -> u64 {
        let unit = match self.unit {
            TimeUnit::Femtoseconds => 1,
            TimeUnit::Picoseconds => 1_000,
            TimeUnit::Nanoseconds => 1_000_000,
            TimeUnit::Microseconds => 1_000_000_000,
            TimeUnit::Milliseconds => 1_000_000_000_000,
            TimeUnit::Seconds => 1_000_000_000_000_000,
        };
        u64::from(self.magnitude) * unit
    }
}

impl fmt::Display for TimeScaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

/// A `<base>/<precision>` time scale, with the precision no coarser than the
/// base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScale {
    pub base: TimeScaleValue,
    pub precision: TimeScaleValue,
}

impl FromStr for TimeScale {
    type Err = ();

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (base, precision) = text.split_once('/').ok_or(())?;
        let base = TimeScaleValue::parse(base).ok_or(())?;
        let precision = TimeScaleValue::parse(precision).ok_or(())?;
        if precision.femtoseconds() > base.femtoseconds() {
            return Err(());
        }
        Ok(Self { base, precision })
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.precision)
    }
}

/// Elaboration knobs; read-only once the driver builds the option bag.
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    pub max_instance_depth: usize,
    pub max_generate_steps: usize,
    pub max_constexpr_depth: usize,
    pub max_constexpr_steps: usize,
    pub max_constexpr_backtrace: usize,
    pub max_instance_array: usize,
    pub error_limit: usize,
    pub suppress_unused: bool,
    pub script_mode: bool,
    pub lint_mode: bool,
    pub allow_hierarchical_const: bool,
    pub allow_dup_initial_drivers: bool,
    pub relax_enum_conversions: bool,
    pub strict_driver_checking: bool,
    pub ignore_unknown_modules: bool,
    pub allow_use_before_declare: bool,
    pub top_modules: Vec<String>,
    pub param_overrides: Vec<String>,
    pub min_typ_max: MinTypMax,
    pub default_time_scale: Option<TimeScale>,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            max_instance_depth: 128,
            max_generate_steps: 131_072,
            max_constexpr_depth: 128,
            max_constexpr_steps: 100_000,
            max_constexpr_backtrace: 10,
            max_instance_array: 65_535,
            error_limit: 64,
            suppress_unused: false,
            script_mode: false,
            lint_mode: false,
            allow_hierarchical_const: false,
            allow_dup_initial_drivers: false,
            relax_enum_conversions: false,
            strict_driver_checking: false,
            ignore_unknown_modules: false,
            allow_use_before_declare: false,
            top_modules: Vec::new(),
            param_overrides: Vec::new(),
            min_typ_max: MinTypMax::Typ,
            default_time_scale: None,
        }
    }
}

struct Elaboration {
    top_instances: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

/// Binds parsed syntax trees and answers the driver's reporting queries.
pub struct Compilation {
    options: CompilationOptions,
    trees: Vec<SyntaxTree>,
    elaboration: Option<Elaboration>,
}

impl Compilation {
    #[must_use]
    pub fn new(options: CompilationOptions) -> Self {
        Self {
            options,
            trees: Vec::new(),
            elaboration: None,
        }
    }

    #[must_use]
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Bind a parsed tree. Invalidates any previous elaboration.
    pub fn add_syntax_tree(&mut self, tree: SyntaxTree) {
        self.elaboration = None;
        self.trees.push(tree);
    }

    #[must_use]
    pub fn trees(&self) -> &[SyntaxTree] {
        &self.trees
    }

    /// Diagnostics produced during preprocessing and parsing, in tree order.
    #[must_use]
    pub fn parse_diagnostics(&self) -> Vec<Diagnostic> {
        self.trees
            .iter()
            .flat_map(|tree| tree.diagnostics.iter().cloned())
            .collect()
    }

    /// Module names that are instantiated but have no definition yet. The
    /// driver uses this to pull candidates from the library search path.
    #[must_use]
    pub fn unresolved_modules(&self) -> Vec<String> {
        let defined: HashSet<&str> = self
            .elements()
            .map(|(_, element)| element.name.as_str())
            .collect();
        let mut missing = Vec::new();
        let mut seen = HashSet::new();
        for (_, element) in self.elements() {
            for instance in &element.instances {
                if !defined.contains(instance.module_name.as_str())
                    && seen.insert(instance.module_name.clone())
                {
                    missing.push(instance.module_name.clone());
                }
            }
        }
        missing
    }

    /// Names of the top-level design units, elaborating on first use.
    pub fn top_instances(&mut self) -> Vec<String> {
        self.ensure_elaborated();
        self.elaboration
            .as_ref()
            .map(|elab| elab.top_instances.clone())
            .unwrap_or_default()
    }

    /// Every diagnostic: parse diagnostics in tree order, then elaboration
    /// diagnostics.
    pub fn all_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.ensure_elaborated();
        let mut diags = self.parse_diagnostics();
        if let Some(elab) = &self.elaboration {
            diags.extend(elab.diagnostics.iter().cloned());
        }
        diags
    }

    fn elements(&self) -> impl Iterator<Item = (&SyntaxTree, &DesignElement)> {
        self.trees
            .iter()
            .flat_map(|tree| tree.elements.iter().map(move |element| (tree, element)))
    }

    fn ensure_elaborated(&mut self) {
        if self.elaboration.is_some() {
            return;
        }

        let mut diagnostics = Vec::new();
        let mut definitions: HashMap<&str, (&SyntaxTree, &DesignElement)> = HashMap::new();

        for (tree, element) in self.elements() {
            match definitions.get(element.name.as_str()) {
                Some((existing_tree, _))
                    if !existing_tree.is_library() && !tree.is_library() =>
                {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagCode::DuplicateDefinition,
                            Some(element.location),
                        )
                        .arg(element.name.clone()),
                    );
                }
                Some(_) => {}
                None => {
                    definitions.insert(element.name.as_str(), (tree, element));
                }
            }
        }

        // Instantiation closure: library modules only pull their children in
        // once something uses them.
        let mut reachable: HashSet<String> = HashSet::new();
        let mut work: Vec<&DesignElement> = self
            .elements()
            .filter(|(tree, _)| !tree.is_library())
            .map(|(_, element)| element)
            .collect();
        let mut queued: HashSet<&str> = work.iter().map(|el| el.name.as_str()).collect();
        while let Some(element) = work.pop() {
            for instance in &element.instances {
                reachable.insert(instance.module_name.clone());
                if let Some(&(_, child)) = definitions.get(instance.module_name.as_str()) {
                    if queued.insert(child.name.as_str()) {
                        work.push(child);
                    }
                }
            }
        }

        let top_instances = if self.options.lint_mode {
            Vec::new()
        } else {
            self.select_tops(&definitions, &reachable, &mut diagnostics)
        };

        if !self.options.lint_mode {
            self.check_unknown_modules(&definitions, &queued, &mut diagnostics);
            self.check_hierarchy_depth(&definitions, &top_instances, &mut diagnostics);
            self.apply_param_overrides(&definitions, &top_instances, &mut diagnostics);
        }

        for (tree, element) in self.elements() {
            if tree.is_library() && !queued.contains(element.name.as_str()) {
                continue;
            }
            self.check_element(element, &mut diagnostics);
        }

        if !self.options.suppress_unused && !self.options.top_modules.is_empty() {
            for (tree, element) in self.elements() {
                if !tree.is_library()
                    && element.kind == ElementKind::Module
                    && !reachable.contains(&element.name)
                    && !top_instances.contains(&element.name)
                {
                    diagnostics.push(
                        Diagnostic::new(DiagCode::UnusedDefinition, Some(element.location))
                            .arg(element.name.clone()),
                    );
                }
            }
        }

        if self.options.error_limit > 0 {
            let mut errors = 0usize;
            let limit = self.options.error_limit;
            diagnostics.retain(|diag| {
                if diag.code.default_severity().counts_as_error() {
                    errors += 1;
                    errors <= limit
                } else {
                    true
                }
            });
        }

        self.elaboration = Some(Elaboration {
            top_instances,
            diagnostics,
        });
    }

    fn select_tops(
        &self,
        definitions: &HashMap<&str, (&SyntaxTree, &DesignElement)>,
        reachable: &HashSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<String> {
        let mut tops = Vec::new();
        if !self.options.top_modules.is_empty() {
            for name in &self.options.top_modules {
                match definitions.get(name.as_str()) {
                    Some((_, element)) if element.kind == ElementKind::Module => {
                        tops.push(element.name.clone());
                    }
                    _ => diagnostics.push(
                        Diagnostic::new(DiagCode::InvalidTopModule, None).arg(name.clone()),
                    ),
                }
            }
        } else {
            for (tree, element) in self.elements() {
                if !tree.is_library()
                    && element.kind == ElementKind::Module
                    && !reachable.contains(&element.name)
                    && !tops.contains(&element.name)
                {
                    tops.push(element.name.clone());
                }
            }
        }

        if tops.is_empty() && !self.options.script_mode {
            diagnostics.push(Diagnostic::new(DiagCode::NoTopModules, None));
        }
        tops
    }

    fn check_unknown_modules(
        &self,
        definitions: &HashMap<&str, (&SyntaxTree, &DesignElement)>,
        elaborated: &HashSet<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if self.options.ignore_unknown_modules {
            return;
        }
        for (tree, element) in self.elements() {
            if tree.is_library() && !elaborated.contains(element.name.as_str()) {
                continue;
            }
            for instance in &element.instances {
                if !definitions.contains_key(instance.module_name.as_str()) {
                    let mut diag =
                        Diagnostic::new(DiagCode::UnknownModule, Some(instance.location))
                            .arg(instance.module_name.clone());
                    diag.hierarchy =
                        Some(format!("{}.{}", element.name, instance.instance_name));
                    diag.macro_name = instance.macro_name.clone();
                    diagnostics.push(diag);
                }
            }
        }
    }

    fn check_hierarchy_depth(
        &self,
        definitions: &HashMap<&str, (&SyntaxTree, &DesignElement)>,
        tops: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let limit = self.options.max_instance_depth;
        if limit == 0 {
            return;
        }
        for top in tops {
            // A module is only re-expanded when seen at a greater depth, so
            // shared subtrees and recursive instantiations stay bounded.
            let mut deepest: HashMap<String, usize> = HashMap::new();
            let mut stack = vec![(top.clone(), 1usize)];
            let mut reported = false;
            while let Some((name, depth)) = stack.pop() {
                if depth > limit {
                    if !reported {
                        reported = true;
                        diagnostics.push(
                            Diagnostic::new(DiagCode::MaxHierarchyDepthExceeded, None)
                                .arg(name.clone()),
                        );
                    }
                    continue;
                }
                match deepest.get(&name) {
                    Some(&seen) if seen >= depth => continue,
                    _ => {
                        deepest.insert(name.clone(), depth);
                    }
                }
                if let Some((_, element)) = definitions.get(name.as_str()) {
                    for instance in &element.instances {
                        stack.push((instance.module_name.clone(), depth + 1));
                    }
                }
            }
        }
    }

    fn apply_param_overrides(
        &self,
        definitions: &HashMap<&str, (&SyntaxTree, &DesignElement)>,
        tops: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for spec in &self.options.param_overrides {
            let name = spec.split_once('=').map_or(spec.as_str(), |(name, _)| name);
            let found = tops.iter().any(|top| {
                definitions
                    .get(top.as_str())
                    .map_or(false, |(_, element)| {
                        element.parameters.iter().any(|param| param.name == name)
                    })
            });
            if !found {
                diagnostics.push(
                    Diagnostic::new(DiagCode::UnknownParamOverride, None).arg(name.to_owned()),
                );
            }
        }
    }

    /// Per-element lint checks on the facts the parser collected.
    fn check_element(&self, element: &DesignElement, diagnostics: &mut Vec<Diagnostic>) {
        if !self.options.relax_enum_conversions {
            let enum_types: HashSet<&str> = element
                .enums
                .iter()
                .map(|enum_type| enum_type.name.as_str())
                .collect();
            let enum_vars: HashMap<&str, &str> = element
                .typed_vars
                .iter()
                .filter(|var| enum_types.contains(var.type_name.as_str()))
                .map(|var| (var.name.as_str(), var.type_name.as_str()))
                .collect();
            for assignment in &element.literal_assignments {
                if let Some(type_name) = enum_vars.get(assignment.target.as_str()) {
                    let mut diag =
                        Diagnostic::new(DiagCode::ImplicitConvert, Some(assignment.location))
                            .arg(*type_name);
                    diag.macro_name = assignment.macro_name.clone();
                    diagnostics.push(diag);
                }
            }
        }

        let ranges: HashMap<&str, (i64, i64)> = element
            .ranged_vars
            .iter()
            .map(|var| {
                (
                    var.name.as_str(),
                    (var.msb.max(var.lsb), var.msb.min(var.lsb)),
                )
            })
            .collect();
        for select in &element.selects {
            let Some(&(high_bound, low_bound)) = ranges.get(select.target.as_str()) else {
                continue;
            };
            let width = high_bound - low_bound + 1;
            match select.low {
                None => {
                    if select.high > high_bound || select.high < low_bound {
                        diagnostics.push(
                            Diagnostic::new(DiagCode::IndexOOB, Some(select.location))
                                .arg(select.high.to_string())
                                .arg(select.target.clone()),
                        );
                    }
                }
                Some(low) => {
                    let select_width = (select.high - low).abs() + 1;
                    if select_width > width {
                        diagnostics.push(
                            Diagnostic::new(DiagCode::RangeWidthOOB, Some(select.location))
                                .arg(select.target.clone()),
                        );
                    } else if select.high > high_bound
                        || select.high < low_bound
                        || low > high_bound
                        || low < low_bound
                    {
                        diagnostics.push(
                            Diagnostic::new(DiagCode::RangeOOB, Some(select.location))
                                .arg(select.target.clone()),
                        );
                    }
                }
            }
        }

        for call in &element.sys_calls {
            match call.name.as_str() {
                "$finish" => {
                    let bad = call
                        .first_arg
                        .as_deref()
                        .map_or(false, |arg| !matches!(arg, "0" | "1" | "2"));
                    if bad {
                        diagnostics.push(Diagnostic::new(
                            DiagCode::BadFinishNum,
                            Some(call.location),
                        ));
                    }
                }
                "$psprintf" | "$countdrivers" | "$list" | "$getpattern" => {
                    diagnostics.push(
                        Diagnostic::new(DiagCode::NonstandardSysFunc, Some(call.location))
                            .arg(call.name.clone()),
                    );
                }
                _ => {}
            }
        }
    }
}
