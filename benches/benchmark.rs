use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reticulate::checkpoint::Checkpoint;
use reticulate::embedding::rebuild::EmbeddingRebuilder;
use reticulate::embedding::table::EmbeddingTable;
use reticulate::likelihood::{MultispeciesCoalescent, MultispeciesCoalescentBuilder};
use reticulate::model::taxon_map::TaxonMap;
use reticulate::newick::{parse_gene_tree_file, parse_network};
use reticulate::population::ConstantPopulation;
use std::hint::black_box;

const NETWORK: &str = "((A:1,(B:0.4)#H1[&gamma=0.3]:0.6):2,(#H1:1.6,C:2):1);";
const GENE_TREES: &str = "tests/fixtures/gene_trees_t3_n4.nwk";
const ASSIGNMENTS: &[(&str, &str)] = &[("kaki_1", "A"), ("kaki_2", "A"), ("pied_1", "B"), ("black_1", "C")];

/// Multispecies coalescent with the fixture gene trees, each repeated `copies` times.
fn setup(copies: usize) -> MultispeciesCoalescent<ConstantPopulation> {
    let network = parse_network(NETWORK).unwrap();
    let mut taxa = TaxonMap::from_assignments(ASSIGNMENTS, &network).unwrap();
    let trees = parse_gene_tree_file(GENE_TREES, &mut taxa).unwrap();

    let model = ConstantPopulation::uniform(&network, 1.5);
    let mut builder = MultispeciesCoalescentBuilder::new(network, model).with_taxon_map(taxa);
    for _ in 0..copies {
        for tree in &trees {
            builder = builder.with_locus(tree.clone());
        }
    }
    builder.build(&mut StdRng::seed_from_u64(42)).unwrap()
}

/// One proposal touching a single gene tree, evaluated with caches, then rejected.
fn propose_and_reject(msc: &mut MultispeciesCoalescent<ConstantPopulation>) -> f64 {
    msc.store();
    let tree = msc.locus_mut(0).gene_tree_mut();
    let root = tree.root_index();
    let height = tree.height(root);
    tree.set_height(root, height + 0.1);
    let log_likelihood = msc.log_likelihood();
    msc.restore();
    log_likelihood
}

fn likelihood_evaluation(c: &mut Criterion) {
    let mut msc = setup(1);
    msc.log_likelihood();

    c.bench_function("cached log-likelihood", |b| {
        b.iter(|| black_box(propose_and_reject(&mut msc)));
    });
    c.bench_function("recomputed log-likelihood", |b| {
        b.iter(|| black_box(msc.recompute_log_likelihood()));
    });
}

fn embedding_rebuild(c: &mut Criterion) {
    let msc = setup(1);
    let network = msc.network();
    let locus = msc.locus(2);
    let rebuilder = EmbeddingRebuilder::new(network, locus.gene_tree(), locus.tips());
    let mut table = EmbeddingTable::new(network, locus.gene_tree());
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("rebuild embedding", |b| {
        b.iter(|| black_box(rebuilder.rebuild(network, locus.gene_tree(), &mut table, &mut rng)));
    });
}

fn many_loci_reporting(c: &mut Criterion) {
    for copies in [10, 100] {
        let mut msc = setup(copies);
        msc.log_likelihood();
        c.bench_function(&format!("cached log-likelihood, {} loci", 3 * copies), |b| {
            b.iter(|| black_box(propose_and_reject(&mut msc)));
        });
        c.bench_function(&format!("recomputed log-likelihood, {} loci", 3 * copies), |b| {
            b.iter(|| black_box(msc.recompute_log_likelihood()));
        });
    }
}

criterion_group!(regression, likelihood_evaluation, embedding_rebuild);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = many_loci_reporting
}
criterion_main!(regression, reporting);
