use logcube_vis::layout::VisLayout;
use tracing::info;

use crate::cli::PathExt;
use crate::cli::ViewArgs;
use crate::error::CliError;
use crate::import;

pub(crate) fn view(args: ViewArgs) -> Result<(), CliError> {
    let output_path = args.output_path.or_current_dir()?;

    info!(
        path = %args.import.path.display(),
        output_path = %output_path.display(),
        "generating report"
    );

    let mut loaded = import::load(&args.import)?;
    import::apply_filters(loaded.session.cube_mut(), &args.filter)?;

    let vis = VisLayout::init(&output_path)?;
    vis.generate_report(&loaded.title, &loaded.session, loaded.spatial.as_deref())?;

    println!("{}", vis.index_file_path().display());

    Ok(())
}
