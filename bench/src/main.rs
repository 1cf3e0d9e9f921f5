use std::collections::VecDeque;
use std::time::Instant;

use log::{info, warn};
use tabledeps_core::{
    all_dependent_tables, dataset_for_row, dependent_tables, depends_on_tables, CaseSensitivity,
    MemoryDatabase, SearchResult, TableDef, Value,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("all");
    let table_count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(500);
    let rows_per_table: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(200);

    if mode == "help" || mode == "--help" {
        println!("Usage: tabledeps-bench [mode] [table_count] [rows_per_table]");
        println!();
        println!("Modes:");
        println!("  all       Run all generators and benchmark each (default)");
        println!("  chain     Each table references the previous one (deep closure)");
        println!("  tree      Branching hierarchy, children reference parents");
        println!("  star      One hub table referenced by every other table");
        println!("  ring      Chain closed into a cycle");
        println!("  random    Uniform random foreign keys");
        println!("  organic   Attach to recent tables with occasional long-range keys");
        println!();
        println!("Default table_count: 500, rows_per_table: 200");
        return;
    }

    println!("tabledeps-bench");
    println!("===============");
    println!();

    let generators: Vec<(&str, fn(usize) -> Vec<Vec<usize>>)> = match mode {
        "chain" => vec![("Chain", gen_chain)],
        "tree" => vec![("Tree (branching 3)", gen_tree)],
        "star" => vec![("Star (single hub)", gen_star)],
        "ring" => vec![("Ring (cycle)", gen_ring)],
        "random" => vec![("Random foreign keys", gen_random)],
        "organic" => vec![("Organic growth", gen_organic)],
        "all" => vec![
            ("Chain", gen_chain as fn(usize) -> Vec<Vec<usize>>),
            ("Tree (branching 3)", gen_tree),
            ("Star (single hub)", gen_star),
            ("Ring (cycle)", gen_ring),
            ("Random foreign keys", gen_random),
            ("Organic growth", gen_organic),
        ],
        _ => {
            eprintln!("Unknown mode: {}. Use --help for options.", mode);
            return;
        }
    };

    for (name, generator) in generators {
        if let Err(e) = run_benchmark(name, generator, table_count, rows_per_table) {
            eprintln!("{}: {}", name, e);
        }
    }
}

fn run_benchmark(
    name: &str,
    generator: fn(usize) -> Vec<Vec<usize>>,
    table_count: usize,
    rows_per_table: usize,
) -> SearchResult<()> {
    println!("--- {} ---", name);
    println!("Target: {} tables, {} rows each", table_count, rows_per_table);

    let t = Instant::now();
    let parents = generator(table_count);
    let db = build_database(&parents, rows_per_table);
    println!(
        "Generated in {:.2}s: {} tables, {} foreign keys, {} rows",
        t.elapsed().as_secs_f64(),
        db.table_count(),
        db.foreign_key_count(),
        db.row_count()
    );

    let first = table_name(0);
    let last = table_name(table_count.saturating_sub(1));

    println!();
    println!("{:>24} {:>10} {:>10}", "operation", "tables", "time");
    println!("{:->24} {:->10} {:->10}", "", "", "");

    let t = Instant::now();
    let imported = dependent_tables(&db, [&last])?;
    report("dependent (last)", imported.len(), t);

    let t = Instant::now();
    let exported = depends_on_tables(&db, [&first])?;
    report("depends-on (first)", exported.len(), t);

    let t = Instant::now();
    let all = all_dependent_tables(&db, [&first])?;
    report("all dependent (first)", all.len(), t);

    if rows_per_table > 0 {
        let t = Instant::now();
        let data = dataset_for_row(&db, &db, &last, [Value::Int(0)])?;
        report("dataset (last, pk 0)", data.len(), t);
        info!("dataset for {} pk 0: {} row(s)", last, data.row_count());
    }

    println!();
    Ok(())
}

fn report(label: &str, tables: usize, start: Instant) {
    println!(
        "{:>24} {:>10} {:>8.1}ms",
        label,
        tables,
        start.elapsed().as_secs_f64() * 1000.0
    );
}

fn table_name(idx: usize) -> String {
    format!("t_{:05}", idx)
}

/// Materialize a parent list into tables with rows.
///
/// Table `i` gets column `id` plus one `ref_<j>` column per parent. Row `r`
/// of every table has primary key `r`; each reference column points at a
/// pseudo-random row of the parent, so filtered extraction fans out.
fn build_database(parents: &[Vec<usize>], rows_per_table: usize) -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Sensitive);
    let mut rng = FastRng::new(4242);

    for (idx, refs) in parents.iter().enumerate() {
        let mut columns = vec!["id".to_string()];
        columns.extend(refs.iter().map(|p| format!("ref_{}", p)));

        let mut def = TableDef::new(table_name(idx), columns).primary_key("id");
        for &p in refs {
            def = def.foreign_key(format!("ref_{}", p), table_name(p), "id");
        }
        if let Err(e) = db.add_table(def) {
            warn!("skipping {}: {}", table_name(idx), e);
            continue;
        }

        let rows = (0..rows_per_table).map(|r| {
            let mut row = Vec::with_capacity(refs.len() + 1);
            row.push(Value::Int(r as i64));
            for _ in refs {
                row.push(Value::Int(rng.next(rows_per_table as u64) as i64));
            }
            row
        });
        if let Err(e) = db.insert_rows(&table_name(idx), rows.collect::<Vec<_>>()) {
            warn!("rows for {}: {}", table_name(idx), e);
        }
    }

    db
}

// ---------------------------------------------------------------------------
// Generators: parents[i] lists the tables table i references.
// All deterministic, single-threaded.
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max.max(1)
    }
}

/// t_i references t_{i-1}. Closure depth equals table count.
fn gen_chain(table_count: usize) -> Vec<Vec<usize>> {
    (0..table_count)
        .map(|i| if i == 0 { Vec::new() } else { vec![i - 1] })
        .collect()
}

/// Breadth-first tree: every table has three child tables referencing it.
fn gen_tree(table_count: usize) -> Vec<Vec<usize>> {
    let branching = 3usize;
    let mut parents = vec![Vec::new(); table_count];
    let mut frontier: VecDeque<usize> = VecDeque::new();
    frontier.push_back(0);
    let mut next = 1usize;

    while let Some(parent) = frontier.pop_front() {
        for _ in 0..branching {
            if next >= table_count {
                return parents;
            }
            parents[next].push(parent);
            frontier.push_back(next);
            next += 1;
        }
    }
    parents
}

/// Every table references t_0.
fn gen_star(table_count: usize) -> Vec<Vec<usize>> {
    (0..table_count)
        .map(|i| if i == 0 { Vec::new() } else { vec![0] })
        .collect()
}

/// Chain plus t_0 referencing the last table.
fn gen_ring(table_count: usize) -> Vec<Vec<usize>> {
    let mut parents = gen_chain(table_count);
    if table_count > 1 {
        parents[0].push(table_count - 1);
    }
    parents
}

/// Each table references up to three uniformly chosen other tables.
fn gen_random(table_count: usize) -> Vec<Vec<usize>> {
    let mut rng = FastRng::new(54321);
    (0..table_count)
        .map(|i| {
            let mut refs: Vec<usize> = (0..3)
                .map(|_| rng.next(table_count as u64) as usize)
                .filter(|&p| p != i)
                .collect();
            refs.sort_unstable();
            refs.dedup();
            refs
        })
        .collect()
}

/// New tables reference a recently added table, with a 10% chance of a
/// second, long-range reference. Keeps growth at a moving frontier.
fn gen_organic(table_count: usize) -> Vec<Vec<usize>> {
    let mut rng = FastRng::new(77777);
    let mut parents = vec![Vec::new(); table_count];
    let mut surface: VecDeque<usize> = VecDeque::with_capacity(65);
    let surface_max = 64usize;
    surface.push_back(0);

    for table in 1..table_count {
        let attach_to = surface[rng.next(surface.len() as u64) as usize];
        parents[table].push(attach_to);

        if rng.next(10) == 0 && table > 1 {
            let other = rng.next(table as u64) as usize;
            if other != attach_to {
                parents[table].push(other);
            }
        }

        surface.push_back(table);
        if surface.len() > surface_max {
            surface.pop_front();
        }
    }
    parents
}
