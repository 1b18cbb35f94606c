use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, warn};

use crate::{
    config::ClassifierConfig,
    elements::Element,
    error::{BuildFailure, ClassificationError},
};

use super::{
    candidate::{CandidateId, ScoredCandidate},
    conflicts::ConflictResolver,
    hints::DocumentHints,
    result::ClassificationResult,
    Label,
};

/// Read-only inputs shared by every classifier while scoring a page.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub hints: &'a DocumentHints,
}

/// Scorer and builder for one label.
///
/// `score` only reads the result: it sees the page blocks and the candidates of the
/// labels listed in `requires`, and returns its own hypotheses. `build` turns one of its
/// candidates into an element and must go through [`ClassificationResult::build`] for
/// any nested candidate.
pub trait Classifier: Send + Sync {
    fn output(&self) -> Label;

    fn requires(&self) -> &[Label];

    fn score(&self, result: &ClassificationResult, ctx: &ScoringContext) -> Vec<ScoredCandidate>;

    fn build(
        &self,
        id: CandidateId,
        result: &mut ClassificationResult,
        registry: &ClassifierRegistry,
    ) -> Result<Element, BuildFailure>;
}

/// Immutable label -> classifier map handed to every build.
#[derive(Default)]
pub struct ClassifierRegistry {
    classifiers: BTreeMap<Label, Box<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn get(&self, label: Label) -> Option<&dyn Classifier> {
        self.classifiers.get(&label).map(|c| c.as_ref())
    }

    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.classifiers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.classifiers.keys()).finish()
    }
}

/// Validated, dependency-ordered set of classifiers plus the page-level build entry.
#[derive(Debug)]
pub struct ClassifierPipeline {
    registry: ClassifierRegistry,
    order: Vec<Label>,
    root: Label,
    resolver: ConflictResolver,
    config: ClassifierConfig,
}

impl ClassifierPipeline {
    /// Default label set, rooted at [`Label::Page`].
    pub fn with_config(config: ClassifierConfig) -> Result<Self, ClassificationError> {
        let classifiers = crate::classifiers::default_classifiers(&config);
        Self::new(classifiers, Label::Page, ConflictResolver::default(), config)
    }

    pub fn new(
        classifiers: Vec<Box<dyn Classifier>>,
        root: Label,
        resolver: ConflictResolver,
        config: ClassifierConfig,
    ) -> Result<Self, ClassificationError> {
        let mut registry = ClassifierRegistry::default();
        for classifier in classifiers {
            let label = classifier.output();
            if registry.classifiers.insert(label, classifier).is_some() {
                return Err(ClassificationError::DuplicateClassifier(label));
            }
        }
        if !registry.classifiers.contains_key(&root) {
            return Err(ClassificationError::MissingRoot(root));
        }
        let order = dependency_order(&registry)?;
        debug!(?order, "classifier order");
        Ok(Self {
            registry,
            order,
            root,
            resolver,
            config,
        })
    }

    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Labels in scoring order: every label comes after the labels it requires.
    pub fn order(&self) -> &[Label] {
        &self.order
    }

    pub fn root(&self) -> Label {
        self.root
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Bottom-up phase: every classifier scores the page in dependency order.
    #[instrument(skip_all, fields(page_index = result.page_index()))]
    pub fn score(
        &self,
        result: &mut ClassificationResult,
        ctx: &ScoringContext,
    ) -> Result<(), ClassificationError> {
        for &label in &self.order {
            let Some(classifier) = self.registry.get(label) else {
                continue;
            };
            let scored = classifier.score(result, ctx);
            let mut registered = 0;
            for candidate in scored {
                if candidate.score() < self.config.min_candidate_score {
                    continue;
                }
                result.add_candidate(label, candidate)?;
                registered += 1;
            }
            debug!(%label, registered, "scored");
        }
        Ok(())
    }

    /// Top-down phase: builds the best root candidate that succeeds.
    #[instrument(skip_all, fields(page_index = result.page_index()))]
    pub fn build_root(&self, result: &mut ClassificationResult) -> Option<CandidateId> {
        let roots: Vec<CandidateId> = result
            .candidates(self.root)
            .iter()
            .map(|c| c.id)
            .collect();
        for id in roots {
            match result.build(id, &self.registry) {
                Ok(_) => {
                    result.set_root(id);
                    return Some(id);
                }
                Err(failure) => {
                    result.warn(format!("{failure}"));
                    result.mark_failed(id, failure.reason);
                }
            }
        }
        warn!(page_index = result.page_index(), root = %self.root, "no root candidate could be built");
        result.warn(format!("no {} candidate could be built", self.root));
        None
    }
}

/// Topologically sorts the registered labels (Kahn's algorithm). The ready queue is a
/// `BTreeSet`, so independent labels come out in `Label` order.
fn dependency_order(registry: &ClassifierRegistry) -> Result<Vec<Label>, ClassificationError> {
    let mut in_degree: BTreeMap<Label, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<Label, Vec<Label>> = BTreeMap::new();

    for (&label, classifier) in &registry.classifiers {
        let requires: BTreeSet<Label> = classifier.requires().iter().copied().collect();
        for &required in &requires {
            if !registry.classifiers.contains_key(&required) {
                return Err(ClassificationError::MissingDependency {
                    classifier: label,
                    required,
                });
            }
            dependents.entry(required).or_default().push(label);
        }
        in_degree.insert(label, requires.len());
    }

    let mut ready: BTreeSet<Label> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&l, _)| l)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(label) = ready.pop_first() {
        order.push(label);
        for dependent in dependents.get(&label).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() != in_degree.len() {
        let cycle = in_degree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(l, _)| l)
            .collect();
        return Err(ClassificationError::DependencyCycle(cycle));
    }
    Ok(order)
}
