//! Multi-rank behaviour, with every rank on its own thread.

use game_of_life_bands::comm::local::run_group;
use game_of_life_bands::gather::gather_snapshot;
use game_of_life_bands::halo::exchange_ghost_rows;
use game_of_life_bands::partition::scatter_band;
use game_of_life_bands::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random soup, roughly a third alive.
fn soup(rows: usize, cols: usize, seed: u64) -> Grid {
    let mut rng = StdRng::seed_from_u64(seed);
    let cells: Vec<bool> = (0..rows * cols).map(|_| rng.gen_bool(1.0 / 3.0)).collect();
    Grid::from_bools(rows, cols, &cells).unwrap()
}

fn blinker() -> Grid {
    find_pattern("blinker").unwrap().to_pattern().to_grid().unwrap()
}

/// Run `generations` generations on `ranks` ranks and return every
/// snapshot gathered on the reporting rank.
fn run_partitioned(
    grid: &Grid,
    ranks: usize,
    generations: u64,
    output_every: u64,
) -> Vec<(u64, Grid)> {
    let config = RunConfig::new(grid.rows(), grid.cols())
        .with_generations(generations)
        .with_output_every(output_every);
    let results = run_group(ranks, |comm| {
        let root_grid = comm.is_root().then_some(grid);
        let mut engine = Engine::new(comm, config, root_grid)?;
        let mut sink = CollectSink::new();
        engine.run(&mut NeverStop, &mut sink)?;
        Ok::<_, LifeError>(sink.frames)
    })
    .unwrap();

    let mut results = results.into_iter();
    let frames = results.next().unwrap().unwrap();
    for other in results {
        assert!(other.unwrap().is_empty(), "only the reporting rank sees snapshots");
    }
    frames
}

#[test]
fn test_partition_covers_every_row_once() {
    for rows in [1usize, 6, 12, 30, 64] {
        for size in 1..=rows.min(8) {
            if rows % size != 0 {
                continue;
            }
            let mut owners = vec![None; rows];
            for rank in 0..size {
                let p = Partition::new(rows, 3, size, rank).unwrap();
                for row in p.owned_range() {
                    assert!(owners[row].is_none(), "row {row} owned twice");
                    owners[row] = Some(rank);
                    assert_eq!(p.owner_of(row), Some(rank));
                }
            }
            assert!(owners.iter().all(Option::is_some), "{rows} rows over {size} ranks left a gap");
        }
    }
}

#[test]
fn test_ghost_rows_mirror_ring_neighbours() {
    for size in 1..=5usize {
        let rows = size * 2;
        let cols = 4;
        let results = run_group(size, |comm| {
            let p = Partition::new(rows, cols, size, comm.rank())?;
            let mut band = Band::new(&p);
            // Tag every owned cell with its global row so rows are distinguishable.
            for (i, global) in p.owned_range().enumerate() {
                band.row_mut(i + 1).fill(global as u8 + 1);
            }
            exchange_ghost_rows(&comm, &p, &mut band)?;
            Ok::<_, LifeError>((p, band))
        })
        .unwrap();
        let bands: Vec<(Partition, Band)> = results.into_iter().map(|r| r.unwrap()).collect();

        for (p, band) in &bands {
            let (_, pred) = &bands[p.predecessor()];
            let (_, succ) = &bands[p.successor()];
            assert_eq!(band.top_ghost(), pred.last_owned(), "P={size} rank {}", p.rank());
            assert_eq!(band.bottom_ghost(), succ.first_owned(), "P={size} rank {}", p.rank());
        }
    }
}

#[test]
fn test_blinker_oscillates_with_period_two() {
    let horizontal = blinker();
    let mut vertical = Grid::new(5, 5).unwrap();
    for r in 1..=3 {
        vertical.set(r, 2, true);
    }

    // One rank, and five ranks holding a single row each.
    for ranks in [1, 5] {
        let frames = run_partitioned(&horizontal, ranks, 2, 1);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], (1, vertical.clone()), "ranks={ranks}");
        assert_eq!(frames[1], (2, horizontal.clone()), "ranks={ranks}");
    }
}

#[test]
fn test_partitioning_does_not_change_the_outcome() {
    let grid = soup(12, 10, 0x5eed);
    let reference: Vec<Grid> = (1..=4).map(|k| grid.advanced(k * 5)).collect();

    for ranks in [1, 2, 3, 4, 6, 12] {
        let frames = run_partitioned(&grid, ranks, 20, 5);
        let generations: Vec<u64> = frames.iter().map(|f| f.0).collect();
        assert_eq!(generations, vec![5, 10, 15, 20], "ranks={ranks}");
        for ((_, got), want) in frames.iter().zip(&reference) {
            assert_eq!(got, want, "ranks={ranks}");
        }
    }
}

#[test]
fn test_dense_boolean_pattern_in_and_out() {
    // R-pentomino on a 9x6 torus, given as a row-major boolean buffer.
    let (rows, cols) = (9, 6);
    let mut dense = vec![false; rows * cols];
    for (r, c) in [(3, 2), (3, 3), (4, 1), (4, 2), (5, 2)] {
        dense[r * cols + c] = true;
    }
    let grid = Grid::from_bools(rows, cols, &dense).unwrap();

    for ranks in [1, 3, 9] {
        let frames = run_partitioned(&grid, ranks, 12, 4);
        let rendered: Vec<Vec<bool>> = frames.iter().map(|(_, g)| g.to_bools()).collect();
        let expected: Vec<Vec<bool>> =
            [4, 8, 12].iter().map(|&k| grid.advanced(k).to_bools()).collect();
        assert_eq!(rendered, expected, "ranks={ranks}");
        assert!(rendered.iter().all(|frame| frame.len() == rows * cols));
    }
}

#[test]
fn test_glider_crosses_band_boundaries() {
    let grid = find_pattern("space_ship").unwrap().to_pattern().to_grid().unwrap();
    let frames = run_partitioned(&grid, 5, 60, 60);
    assert_eq!(frames.last().unwrap().1, grid.advanced(60));
}

#[test]
fn test_scatter_then_gather_is_identity() {
    let grid = soup(8, 7, 42);
    for ranks in [1, 2, 4, 8] {
        let results = run_group(ranks, |comm| {
            let p = Partition::new(8, 7, ranks, comm.rank())?;
            let band = scatter_band(&comm, &p, comm.is_root().then_some(&grid))?;
            gather_snapshot(&comm, &p, &band)
        })
        .unwrap();
        let gathered = results.into_iter().next().unwrap().unwrap();
        assert_eq!(gathered.as_ref(), Some(&grid), "ranks={ranks}");
    }
}

#[test]
fn test_stop_at_generation_g_runs_exactly_g_on_every_rank() {
    let grid = soup(8, 8, 7);
    let config = RunConfig::new(8, 8);
    let results = run_group(4, |comm| {
        let root_grid = comm.is_root().then_some(&grid);
        let mut engine = Engine::new(comm, config, root_grid)?;
        let mut stop = FnStop(|generation: u64, _: &Grid| generation != 6);
        let summary = engine.run(&mut stop, &mut NullSink)?;
        Ok::<_, LifeError>((summary.generations, engine.generation(), engine.state()))
    })
    .unwrap();

    for result in results {
        assert_eq!(result.unwrap(), (6, 6, EngineState::Stopped));
    }
}

#[test]
fn test_throttled_sync_stops_at_a_sync_point() {
    let grid = soup(6, 6, 3);
    let config = RunConfig::new(6, 6).with_output_every(4);
    let results = run_group(3, |comm| {
        let root_grid = comm.is_root().then_some(&grid);
        let mut engine = Engine::new(comm, config, root_grid)?;
        // Asks to stop as soon as it is consulted after generation 5;
        // the next sync point is generation 8.
        let mut stop = FnStop(|generation: u64, _: &Grid| generation < 5);
        engine.run(&mut stop, &mut NullSink)
    })
    .unwrap();

    for result in results {
        assert_eq!(result.unwrap().generations, 8);
    }
}

#[test]
fn test_uneven_partition_fails_every_rank_before_scatter() {
    let grid = soup(10, 4, 1);
    let results = run_group(3, |comm| {
        let root_grid = comm.is_root().then_some(&grid);
        Engine::new(comm, RunConfig::new(10, 4), root_grid).map(|_| ())
    })
    .unwrap();
    for result in results {
        assert!(matches!(result, Err(LifeError::Configuration(_))));
    }
}

#[test]
fn test_departed_rank_tears_down_the_group() {
    let grid = soup(8, 5, 9);
    let config = RunConfig::new(8, 5).with_generations(10);
    let results = run_group(4, |comm| {
        let rank = comm.rank();
        let root_grid = comm.is_root().then_some(&grid);
        let mut engine = Engine::new(comm, config, root_grid)?;
        if rank == 2 {
            // Leaves right after the scatter.
            return Ok(None);
        }
        engine.run(&mut NeverStop, &mut NullSink).map(Some)
    })
    .unwrap();

    for (rank, result) in results.into_iter().enumerate() {
        if rank == 2 {
            assert!(result.unwrap().is_none());
        } else {
            assert!(
                matches!(result, Err(LifeError::Communication { .. })),
                "rank {rank} should have failed"
            );
        }
    }
}

#[test]
fn test_text_output_across_ranks() {
    let grid = blinker();
    let config = RunConfig::new(5, 5).with_generations(1);
    let results = run_group(5, |comm| {
        let root_grid = comm.is_root().then_some(&grid);
        let mut engine = Engine::new(comm, config, root_grid)?;
        let mut sink = TextSink::new(Vec::new());
        engine.run(&mut NeverStop, &mut sink)?;
        Ok::<_, LifeError>(sink.into_inner())
    })
    .unwrap();

    let text = String::from_utf8(results.into_iter().next().unwrap().unwrap()).unwrap();
    assert_eq!(text, "Generation 1:\n00000\n00100\n00100\n00100\n00000\n");
}
